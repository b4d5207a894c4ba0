//! Marker protocol and noise filtering as a single state machine.
//!
//! opencode is asked to wrap its answer in `<opencode_output>` tags; everything
//! it prints outside the tags (banners, tool logs) is discarded. Inside the
//! region, the `@<agent> <provider>/<model>` banner and the blank padding
//! before the first real line are dropped too.

pub const START_MARKER: &str = "<opencode_output>";
pub const END_MARKER: &str = "</opencode_output>";

/// First character of the model-prefix banner line.
pub const NOISE_SENTINEL: char = '@';

pub const DEFAULT_PROVIDER_TAG: &str = "github-copilot";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegionState {
    #[default]
    Outside,
    Inside {
        /// A non-empty line has been emitted; blank lines are content from now on.
        content_emitted: bool,
    },
    Done,
}

impl RegionState {
    pub fn is_done(self) -> bool {
        matches!(self, RegionState::Done)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    OutsideRegion,
    StartMarker,
    NoiseLine,
    LeadingBlank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineAction<'a> {
    Discard(DiscardReason),
    /// Emit the line followed by a single `\n`.
    Emit(&'a str),
    /// End marker seen; stop reading this invocation's output.
    Stop,
}

#[derive(Debug, Clone)]
pub struct MarkerFilter {
    provider_tag: String,
}

impl Default for MarkerFilter {
    fn default() -> Self {
        Self::new(DEFAULT_PROVIDER_TAG)
    }
}

impl MarkerFilter {
    pub fn new(provider_tag: impl Into<String>) -> Self {
        Self {
            provider_tag: provider_tag.into(),
        }
    }

    pub fn provider_tag(&self) -> &str {
        &self.provider_tag
    }

    pub fn is_noise_line(&self, line: &str) -> bool {
        line.starts_with(NOISE_SENTINEL) && line.contains(self.provider_tag.as_str())
    }

    /// Transition on one completed, SGR-stripped line (without its terminator).
    ///
    /// Inside the region the checks run in a fixed order: end marker, repeated
    /// start marker, noise banner, leading blank, content.
    pub fn step<'a>(&self, state: RegionState, line: &'a str) -> (RegionState, LineAction<'a>) {
        match state {
            RegionState::Done => (RegionState::Done, LineAction::Stop),
            RegionState::Outside => {
                if line.contains(START_MARKER) {
                    (
                        RegionState::Inside {
                            content_emitted: false,
                        },
                        LineAction::Discard(DiscardReason::StartMarker),
                    )
                } else {
                    (
                        RegionState::Outside,
                        LineAction::Discard(DiscardReason::OutsideRegion),
                    )
                }
            }
            RegionState::Inside { content_emitted } => {
                if line.contains(END_MARKER) {
                    (RegionState::Done, LineAction::Stop)
                } else if line.contains(START_MARKER) {
                    (state, LineAction::Discard(DiscardReason::StartMarker))
                } else if self.is_noise_line(line) {
                    (state, LineAction::Discard(DiscardReason::NoiseLine))
                } else if line.is_empty() && !content_emitted {
                    (state, LineAction::Discard(DiscardReason::LeadingBlank))
                } else {
                    (
                        RegionState::Inside {
                            content_emitted: content_emitted || !line.is_empty(),
                        },
                        LineAction::Emit(line),
                    )
                }
            }
        }
    }
}
