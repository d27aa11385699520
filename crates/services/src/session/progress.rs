/// Aggregated view of attempt progress, useful for the navigator grid and
/// the submit-confirmation dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub flagged: usize,
    pub unanswered: usize,
    pub is_complete: bool,
}
