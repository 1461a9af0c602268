// matcher.rs: name heuristics used to pick plugin objects out of a listing

/// Predicate over object names.
pub trait NameMatcher: Send + Sync {
    fn matches(&self, name: &str) -> bool;
}

/// Case-sensitive substring match.
#[derive(Clone, Copy, Debug)]
pub struct Contains(pub &'static str);

impl NameMatcher for Contains {
    fn matches(&self, name: &str) -> bool {
        name.contains(self.0)
    }
}

impl<F> NameMatcher for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn matches(&self, name: &str) -> bool {
        self(name)
    }
}

/// Which candidate wins when more than one object matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TieBreak {
    First,
    /// last one in listing order
    #[default]
    Last,
}

impl TieBreak {
    pub fn select<I, T>(&self, candidates: I) -> Option<T>
    where
        I: IntoIterator<Item = T>,
    {
        let mut iter = candidates.into_iter();
        match self {
            TieBreak::First => iter.next(),
            TieBreak::Last => iter.last(),
        }
    }
}

#[test]
fn test_contains_is_case_sensitive() {
    let m = Contains("flannel");
    assert!(m.matches("kube-flannel-ds"));
    assert!(m.matches("flannel"));
    assert!(!m.matches("kube-Flannel-ds"));
    assert!(!m.matches("calico-node"));
}

#[test]
fn test_closure_matcher() {
    let exact = |name: &str| name == "kube-flannel-ds";
    assert!(exact.matches("kube-flannel-ds"));
    assert!(!exact.matches("kube-flannel-ds-amd64"));
}

#[test]
fn test_tie_break_select() {
    let names = vec!["a-flannel", "b-flannel", "c-flannel"];
    assert_eq!(TieBreak::default(), TieBreak::Last);
    assert_eq!(TieBreak::Last.select(names.iter()), Some(&"c-flannel"));
    assert_eq!(TieBreak::First.select(names.iter()), Some(&"a-flannel"));
    assert_eq!(TieBreak::Last.select(Vec::<&str>::new()), None);
}
