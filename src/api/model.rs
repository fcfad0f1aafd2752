use serde::Serialize;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub(super) enum Outcome {
    Presented,
    CleanedUp,
    /// `present` for a record that is already published.
    AlreadyExists,
    /// `cleanup` for a record that isn't published.
    DoesNotExist,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct ChallengeResult {
    pub result: Outcome,
}
