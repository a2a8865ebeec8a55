/// Chooses which NXdata group of the entry viewers plot by default.
pub trait DefaultDataGroupSelector {
    /// Implementation should return one of `group_names`, or `None` to leave the
    /// entry without a default.
    fn select(&self, group_names: &[String]) -> Option<String>;
}

/// Selects the group added first.
#[derive(Clone, Copy, Debug, Default)]
pub struct FirstDataGroupSelector;

impl DefaultDataGroupSelector for FirstDataGroupSelector {
    fn select(&self, group_names: &[String]) -> Option<String> {
        group_names.first().cloned()
    }
}
