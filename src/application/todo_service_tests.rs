#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::super::todo_service::{TodoService, TodoServiceImpl};
    use crate::domain::clock::MonotonicClock;
    use crate::domain::error::{TodoError, TodoResult};
    use crate::domain::ordering::{Filter, ListQuery};
    use crate::domain::repository::TodoRepository;
    use crate::domain::todo::{CreateTodo, NewTodo, Patch, Todo, TodoId, UpdateTodo};
    use crate::infrastructure::memory_repo::InMemoryTodoRepository;

    fn service() -> TodoServiceImpl<InMemoryTodoRepository> { TodoServiceImpl::new(InMemoryTodoRepository::new()) }

    async fn titles(service: &impl TodoService, query: ListQuery) -> Vec<String> {
        service.list(query).await.unwrap().into_iter().map(|t| t.title).collect()
    }

    #[tokio::test]
    async fn unit_create_and_get() {
        let service = service();
        let created = service.create(CreateTodo::titled("  X  ")).await.unwrap();
        assert_eq!(created.title, "X");
        assert!(!created.completed);
        assert_eq!(created.order, 0);
        assert_eq!(created.created_at, created.updated_at);
        let got = service.get(created.id.clone()).await.unwrap().unwrap();
        assert_eq!(got, created);
    }

    #[tokio::test]
    async fn create_rejects_blank_title() {
        let service = service();
        assert!(matches!(service.create(CreateTodo::titled("   ")).await, Err(TodoError::InvalidInput(_))));
        assert!(service.list(ListQuery::all()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_appends_after_max_order_regardless_of_gaps() {
        let service = service();
        let a = service.create(CreateTodo::titled("a")).await.unwrap();
        let b = service.create(CreateTodo::titled("b")).await.unwrap();
        let c = service.create(CreateTodo::titled("c")).await.unwrap();
        assert_eq!((a.order, b.order, c.order), (0, 1, 2));

        service.delete(b.id).await.unwrap();
        service.toggle_complete(c.id.clone()).await.unwrap();
        let d = service.create(CreateTodo::titled("d")).await.unwrap();
        assert_eq!(d.order, 3);

        service.delete(c.id).await.unwrap();
        service.delete(d.id).await.unwrap();
        let e = service.create(CreateTodo::titled("e")).await.unwrap();
        assert_eq!(e.order, 1);
    }

    #[tokio::test]
    async fn orders_stay_unique_across_creates_and_deletes() {
        let service = service();
        let mut ids = Vec::new();
        for i in 0..20 {
            ids.push(service.create(CreateTodo::titled(format!("t{i}"))).await.unwrap().id);
            if i % 3 == 2 {
                service.delete(ids.remove(i % ids.len())).await.unwrap();
            }
            let orders: Vec<i64> = service.list(ListQuery::all()).await.unwrap().iter().map(|t| t.order).collect();
            let unique: HashSet<_> = orders.iter().collect();
            assert_eq!(unique.len(), orders.len());
            assert!(orders.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[tokio::test]
    async fn list_filters_and_searches() {
        let service = service();
        service.create(CreateTodo { title: "Buy milk".into(), description: None, due_date: None }).await.unwrap();
        let walk = service.create(CreateTodo { title: "Walk dog".into(), description: Some("take the MILK route".into()), due_date: None }).await.unwrap();
        service.create(CreateTodo::titled("Write code")).await.unwrap();
        service.toggle_complete(walk.id).await.unwrap();

        assert_eq!(titles(&service, ListQuery::all()).await, ["Buy milk", "Walk dog", "Write code"]);
        assert_eq!(titles(&service, ListQuery::filtered(Filter::Active)).await, ["Buy milk", "Write code"]);
        assert_eq!(titles(&service, ListQuery::filtered(Filter::Completed)).await, ["Walk dog"]);
        assert_eq!(titles(&service, ListQuery::searching("milk")).await, ["Buy milk", "Walk dog"]);
        assert_eq!(titles(&service, ListQuery { filter: Filter::Active, search: Some("MILK".into()) }).await, ["Buy milk"]);
        assert!(titles(&service, ListQuery::searching("nothing")).await.is_empty());
    }

    #[tokio::test]
    async fn list_is_idempotent() {
        let service = service();
        for t in ["a", "b", "c"] {
            service.create(CreateTodo::titled(t)).await.unwrap();
        }
        let first = service.list(ListQuery::all()).await.unwrap();
        let second = service.list(ListQuery::all()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn update_applies_only_present_fields() {
        let service = service();
        let todo = service.create(CreateTodo { title: "a".into(), description: Some("keep".into()), due_date: None }).await.unwrap();

        let touched = service.update(todo.id.clone(), UpdateTodo::default()).await.unwrap();
        assert_eq!(touched.title, "a");
        assert_eq!(touched.description.as_deref(), Some("keep"));
        assert!(touched.updated_at > todo.updated_at);

        let renamed = service.update(todo.id.clone(), UpdateTodo { title: Some(" b ".into()), completed: Some(true), ..Default::default() }).await.unwrap();
        assert_eq!(renamed.title, "b");
        assert!(renamed.completed);
        assert_eq!(renamed.description.as_deref(), Some("keep"));
        assert_eq!(renamed.order, todo.order);

        let cleared = service.update(todo.id.clone(), UpdateTodo { description: Patch::Clear, ..Default::default() }).await.unwrap();
        assert_eq!(cleared.description, None);

        assert!(matches!(
            service.update(todo.id, UpdateTodo { title: Some("".into()), ..Default::default() }).await,
            Err(TodoError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn update_and_toggle_unknown_id_are_not_found() {
        let service = service();
        let ghost = TodoId::new();
        assert!(matches!(service.update(ghost.clone(), UpdateTodo::default()).await, Err(TodoError::NotFound(id)) if id == ghost));
        assert!(matches!(service.toggle_complete(ghost.clone()).await, Err(TodoError::NotFound(_))));
        assert!(matches!(service.delete(ghost).await, Err(TodoError::NotFound(_))));
    }

    #[tokio::test]
    async fn toggle_twice_restores_with_increasing_updated_at() {
        let service = service();
        let todo = service.create(CreateTodo::titled("a")).await.unwrap();
        let once = service.toggle_complete(todo.id.clone()).await.unwrap();
        let twice = service.toggle_complete(todo.id.clone()).await.unwrap();
        assert!(once.completed);
        assert!(!twice.completed);
        assert!(todo.updated_at < once.updated_at);
        assert!(once.updated_at < twice.updated_at);
    }

    #[tokio::test]
    async fn concurrent_toggles_do_not_lose_updates() {
        let service = service();
        let todo = service.create(CreateTodo::titled("a")).await.unwrap();
        let mut handles = Vec::new();
        for _ in 0..10 {
            let service = service.clone();
            let id = todo.id.clone();
            handles.push(tokio::spawn(async move { service.toggle_complete(id).await.unwrap() }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let after = service.get(todo.id).await.unwrap().unwrap();
        assert!(!after.completed);
    }

    #[tokio::test]
    async fn reorder_full_set() {
        let service = service();
        let a = service.create(CreateTodo::titled("A")).await.unwrap();
        let b = service.create(CreateTodo::titled("B")).await.unwrap();
        let c = service.create(CreateTodo::titled("C")).await.unwrap();
        service.reorder(vec![c.id.clone(), a.id.clone(), b.id.clone()]).await.unwrap();
        let listed: Vec<(String, i64)> = service.list(ListQuery::all()).await.unwrap().into_iter().map(|t| (t.title, t.order)).collect();
        assert_eq!(listed, [("C".to_string(), 0), ("A".to_string(), 1), ("B".to_string(), 2)]);

        let moved = service.get(a.id).await.unwrap().unwrap();
        assert!(moved.updated_at > a.updated_at);
    }

    #[tokio::test]
    async fn reorder_of_filtered_view_keeps_hidden_items_in_place() {
        let service = service();
        let mut ids = Vec::new();
        for t in ["A", "B", "C", "D"] {
            ids.push(service.create(CreateTodo::titled(t)).await.unwrap().id);
        }
        service.toggle_complete(ids[1].clone()).await.unwrap();
        service.toggle_complete(ids[3].clone()).await.unwrap();
        let completed: Vec<TodoId> = service.list(ListQuery::filtered(Filter::Completed)).await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(completed, [ids[1].clone(), ids[3].clone()]);

        service.reorder(vec![ids[3].clone(), ids[1].clone()]).await.unwrap();
        let listed: Vec<(String, i64)> = service.list(ListQuery::all()).await.unwrap().into_iter().map(|t| (t.title, t.order)).collect();
        assert_eq!(listed, [("A".to_string(), 0), ("D".to_string(), 1), ("C".to_string(), 2), ("B".to_string(), 3)]);
    }

    #[tokio::test]
    async fn reorder_with_unknown_id_changes_nothing() {
        let service = service();
        let a = service.create(CreateTodo::titled("A")).await.unwrap();
        let b = service.create(CreateTodo::titled("B")).await.unwrap();
        let before = service.list(ListQuery::all()).await.unwrap();
        assert!(matches!(service.reorder(vec![b.id.clone(), TodoId::new(), a.id.clone()]).await, Err(TodoError::NotFound(_))));
        assert!(matches!(service.reorder(vec![b.id.clone(), b.id]).await, Err(TodoError::InvalidInput(_))));
        assert_eq!(service.list(ListQuery::all()).await.unwrap(), before);
    }

    #[tokio::test]
    async fn clear_completed_removes_only_completed() {
        let service = service();
        let a = service.create(CreateTodo::titled("A")).await.unwrap();
        let b = service.create(CreateTodo::titled("B")).await.unwrap();
        let c = service.create(CreateTodo::titled("C")).await.unwrap();
        service.toggle_complete(b.id).await.unwrap();
        service.toggle_complete(c.id).await.unwrap();

        assert_eq!(service.clear_completed().await.unwrap(), 2);
        let rest = service.list(ListQuery::all()).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, a.id);
        assert_eq!(rest[0].order, a.order);
        assert!(service.list(ListQuery::filtered(Filter::Completed)).await.unwrap().is_empty());
        assert_eq!(service.clear_completed().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_leaves_gaps() {
        let service = service();
        let a = service.create(CreateTodo::titled("A")).await.unwrap();
        let b = service.create(CreateTodo::titled("B")).await.unwrap();
        let c = service.create(CreateTodo::titled("C")).await.unwrap();
        service.delete(b.id.clone()).await.unwrap();
        let rest: Vec<(TodoId, i64)> = service.list(ListQuery::all()).await.unwrap().into_iter().map(|t| (t.id, t.order)).collect();
        assert_eq!(rest, [(a.id, 0), (c.id, 2)]);
        assert!(service.get(b.id).await.unwrap().is_none());
    }

    /// Holds back the next `toggle` before it reaches the wrapped backend.
    #[derive(Clone, Default)]
    struct StallingRepo {
        inner: InMemoryTodoRepository,
        stall_next_toggle: Arc<AtomicBool>,
    }

    #[async_trait]
    impl TodoRepository for StallingRepo {
        async fn init(&self) -> TodoResult<()> { self.inner.init().await }
        async fn insert(&self, input: NewTodo) -> TodoResult<Todo> { self.inner.insert(input).await }
        async fn get(&self, id: &TodoId) -> TodoResult<Option<Todo>> { self.inner.get(id).await }
        async fn list(&self) -> TodoResult<Vec<Todo>> { self.inner.list().await }
        async fn patch(&self, id: &TodoId, input: UpdateTodo, clock: &MonotonicClock) -> TodoResult<Option<Todo>> {
            self.inner.patch(id, input, clock).await
        }
        async fn toggle(&self, id: &TodoId, clock: &MonotonicClock) -> TodoResult<Option<Todo>> {
            if self.stall_next_toggle.swap(false, Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            self.inner.toggle(id, clock).await
        }
        async fn delete(&self, id: &TodoId) -> TodoResult<bool> { self.inner.delete(id).await }
        async fn reorder(&self, ids: &[TodoId], clock: &MonotonicClock) -> TodoResult<()> {
            self.inner.reorder(ids, clock).await
        }
        async fn delete_completed(&self) -> TodoResult<u64> { self.inner.delete_completed().await }
    }

    #[tokio::test]
    async fn updated_at_follows_apply_order_when_a_toggle_stalls() {
        let repo = StallingRepo::default();
        let service = TodoServiceImpl::new(repo.clone());
        let todo = service.create(CreateTodo::titled("a")).await.unwrap();

        repo.stall_next_toggle.store(true, Ordering::SeqCst);
        let stalled = {
            let service = service.clone();
            let id = todo.id.clone();
            tokio::spawn(async move { service.toggle_complete(id).await.unwrap() })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let prompt = service.toggle_complete(todo.id.clone()).await.unwrap();
        let late = stalled.await.unwrap();

        assert!(prompt.completed);
        assert!(!late.completed);
        assert!(late.updated_at > prompt.updated_at);
        let stored = service.get(todo.id).await.unwrap().unwrap();
        assert_eq!(stored.updated_at, late.updated_at);
        assert!(!stored.completed);
    }
}
