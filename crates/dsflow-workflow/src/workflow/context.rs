//! Ambient workflow scope.
//!
//! Tasks built without an explicit workflow attach to the innermost scope
//! of the current tokio task. Scopes nest and are restored on exit; other
//! tokio tasks and threads never observe them.

use std::future::Future;

use super::Workflow;

tokio::task_local! {
    static CURRENT: Workflow;
}

impl Workflow {
    /// Runs `future` with this workflow in scope.
    pub async fn scope<F>(&self, future: F) -> F::Output
    where
        F: Future,
    {
        CURRENT.scope(self.clone(), future).await
    }

    /// Runs `f` with this workflow in scope.
    pub fn sync_scope<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        CURRENT.sync_scope(self.clone(), f)
    }

    /// Innermost workflow in scope, if any.
    pub fn current() -> Option<Workflow> {
        CURRENT.try_with(Workflow::clone).ok()
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::mock_workflow;
    use crate::workflow::Workflow;

    #[tokio::test]
    async fn test_no_scope_by_default() {
        assert!(Workflow::current().is_none());
    }

    #[tokio::test]
    async fn test_nested_scopes_restore_outer() {
        let (outer, _gateway) = mock_workflow("outer");
        let (inner, _gateway) = mock_workflow("inner");

        outer
            .scope(async {
                assert_eq!(Workflow::current(), Some(outer.clone()));
                inner
                    .scope(async {
                        assert_eq!(Workflow::current(), Some(inner.clone()));
                    })
                    .await;
                assert_eq!(Workflow::current(), Some(outer.clone()));
            })
            .await;

        assert!(Workflow::current().is_none());
    }

    #[tokio::test]
    async fn test_scope_is_not_shared_with_spawned_tasks() {
        let (workflow, _gateway) = mock_workflow("isolated");

        let seen = workflow
            .scope(async {
                tokio::spawn(async { Workflow::current().is_some() })
                    .await
                    .expect("join")
            })
            .await;
        assert!(!seen);
    }

    #[test]
    fn test_sync_scope() {
        let (workflow, _gateway) = mock_workflow("sync");
        let name = workflow.sync_scope(|| Workflow::current().map(|wf| wf.name().to_owned()));
        assert_eq!(name.as_deref(), Some("sync"));
    }
}
