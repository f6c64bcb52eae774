//! Path classification for the invocation routes.

/// The four invocation routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// `/workflow/{app_id}`
    DynamicWorkflow,
    /// `/chatflow/{app_id}`
    DynamicChatflow,
    /// `/single-workflow`
    SingleWorkflow,
    /// `/single-chatflow`
    SingleChatflow,
}

/// Prefixes in match order; the first one that matches wins.
const PREFIXES: [(&str, RouteKind); 4] = [
    ("/workflow", RouteKind::DynamicWorkflow),
    ("/chatflow", RouteKind::DynamicChatflow),
    ("/single-workflow", RouteKind::SingleWorkflow),
    ("/single-chatflow", RouteKind::SingleChatflow),
];

impl RouteKind {
    /// Classify a request path; `None` means the path is not routable.
    pub fn classify(path: &str) -> Option<Self> {
        PREFIXES
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix))
            .map(|(_, kind)| *kind)
    }

    pub fn prefix(self) -> &'static str {
        match self {
            Self::DynamicWorkflow => "/workflow",
            Self::DynamicChatflow => "/chatflow",
            Self::SingleWorkflow => "/single-workflow",
            Self::SingleChatflow => "/single-chatflow",
        }
    }

    pub fn is_dynamic(self) -> bool {
        matches!(self, Self::DynamicWorkflow | Self::DynamicChatflow)
    }

    pub fn is_chatflow(self) -> bool {
        matches!(self, Self::DynamicChatflow | Self::SingleChatflow)
    }

    /// App id carried in the path of a dynamic route.
    ///
    /// `/workflow/abc` and `/workflow/abc/` yield `abc`; `/workflow`,
    /// `/workflow/` and `/workflowabc` yield `None`.
    pub fn path_app_id(self, path: &str) -> Option<&str> {
        if !self.is_dynamic() {
            return None;
        }

        path.strip_prefix(self.prefix())?
            .strip_prefix('/')?
            .split('/')
            .next()
            .filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_prefixes() {
        assert_eq!(RouteKind::classify("/workflow/app-1"), Some(RouteKind::DynamicWorkflow));
        assert_eq!(RouteKind::classify("/chatflow/app-1"), Some(RouteKind::DynamicChatflow));
        assert_eq!(RouteKind::classify("/single-workflow"), Some(RouteKind::SingleWorkflow));
        assert_eq!(RouteKind::classify("/single-chatflow"), Some(RouteKind::SingleChatflow));
    }

    #[test]
    fn test_classify_prefix_only() {
        assert_eq!(RouteKind::classify("/workflow"), Some(RouteKind::DynamicWorkflow));
        assert_eq!(RouteKind::classify("/chatflowx"), Some(RouteKind::DynamicChatflow));
        assert_eq!(
            RouteKind::classify("/single-chatflow/extra"),
            Some(RouteKind::SingleChatflow)
        );
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(RouteKind::classify("/"), None);
        assert_eq!(RouteKind::classify(""), None);
        assert_eq!(RouteKind::classify("/health"), None);
        assert_eq!(RouteKind::classify("/api/workflow/app"), None);
        assert_eq!(RouteKind::classify("/Workflow/app"), None);
    }

    #[test]
    fn test_prefix_round_trip() {
        for (prefix, kind) in PREFIXES {
            assert_eq!(kind.prefix(), prefix);
            assert_eq!(RouteKind::classify(kind.prefix()), Some(kind));
        }
    }

    #[test]
    fn test_path_app_id() {
        let kind = RouteKind::DynamicWorkflow;
        assert_eq!(kind.path_app_id("/workflow/abc"), Some("abc"));
        assert_eq!(kind.path_app_id("/workflow/abc/"), Some("abc"));
        assert_eq!(kind.path_app_id("/workflow/abc/run"), Some("abc"));
        assert_eq!(kind.path_app_id("/workflow/"), None);
        assert_eq!(kind.path_app_id("/workflow"), None);
        assert_eq!(kind.path_app_id("/workflowabc"), None);

        assert_eq!(RouteKind::SingleWorkflow.path_app_id("/single-workflow/abc"), None);
    }

    #[test]
    fn test_flags() {
        assert!(RouteKind::DynamicChatflow.is_chatflow());
        assert!(RouteKind::DynamicChatflow.is_dynamic());
        assert!(!RouteKind::SingleWorkflow.is_chatflow());
        assert!(!RouteKind::SingleWorkflow.is_dynamic());
    }
}
