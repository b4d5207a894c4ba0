pub mod opencode;

pub use opencode::OpencodeBackendStrategy;
