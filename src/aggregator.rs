//! Walks the issue tree of a project or task and flattens it into report rows.

use log::{debug, info};
use megaplan_api::{Issue, MegaplanClient, TaskDetail};

use crate::error::{ReportError, Result};
use crate::hierarchy::{ChildLabel, HierarchyRules};
use crate::report::ReportRow;
use crate::text::{clean_html, format_launch_date, product_lines};

/// Entity a report is built for: its display name, its resolved responsible and its direct children.
#[derive(Debug, Clone)]
pub struct ReportRoot {
    pub name: String,
    pub responsible: String,
    pub issues: Vec<Issue>,
}

/// Per-issue values shared by every product row of that issue.
struct DevelopmentSummary {
    owner: String,
    raw_materials_note: String,
    packaging_note: String,
    last_comment: String,
    products: Vec<String>,
}

pub struct TreeAggregator<'a> {
    client: &'a MegaplanClient,
    rules: &'a HierarchyRules,
}

impl<'a> TreeAggregator<'a> {
    pub fn new(client: &'a MegaplanClient, rules: &'a HierarchyRules) -> Self {
        Self { client, rules }
    }

    /// Rows for every product line found under the root's issues, numbered from 1.
    ///
    /// Remote calls are issued one after another. Any failure other than a
    /// comment fetch aborts the whole collection.
    pub async fn collect(&self, root: &ReportRoot) -> Result<Vec<ReportRow>> {
        let mut rows = Vec::new();
        for issue in &root.issues {
            self.collect_issue(root, issue, &mut rows).await?;
        }
        info!("Collected {} report rows for '{}'", rows.len(), root.name);
        Ok(rows)
    }

    async fn collect_issue(&self, root: &ReportRoot, issue: &Issue, rows: &mut Vec<ReportRow>) -> Result<()> {
        let detail = self.client.get_task(&issue.id).await?;

        let Some(development) = self.rules.find(ChildLabel::Development, &detail.sub_tasks) else {
            debug!("Issue {} ('{}') has no development task", issue.id, issue.name);
            return Ok(());
        };
        info!("Found development task '{}' ({})", development.name, development.id);

        let summary = self.summarize_development(&development.id).await?;
        if summary.products.is_empty() {
            return Ok(());
        }

        let launch_date = launch_date(&detail)?;
        for product in summary.products {
            rows.push(ReportRow {
                index: rows.len() + 1,
                project_name: root.name.clone(),
                issue_name: issue.name.clone(),
                product_line: product,
                launch_date: launch_date.clone(),
                bm_responsible: root.responsible.clone(),
                oz_responsible: summary.owner.clone(),
                raw_materials_note: summary.raw_materials_note.clone(),
                packaging_note: summary.packaging_note.clone(),
                last_comment: summary.last_comment.clone(),
            });
        }
        Ok(())
    }

    async fn summarize_development(&self, task_id: &str) -> Result<DevelopmentSummary> {
        let development = self.client.get_task(task_id).await?;

        let party = development
            .responsible_or_owner()
            .ok_or_else(|| ReportError::missing(format!("task {}", development.id), "responsible"))?;
        let owner = self.client.responsible_name(party).await?;

        let raw_materials_note = self.supplier_note(ChildLabel::RawMaterials, &development).await?;
        let packaging_note = self.supplier_note(ChildLabel::Packaging, &development).await?;

        let last_comment = match development.comments.last() {
            Some(comment) => clean_html(&self.client.get_comment(&comment.id).await),
            None => String::new(),
        };

        let products = product_lines(development.subject.as_deref().unwrap_or_default());
        debug!("Task {} lists {} products", development.id, products.len());

        Ok(DevelopmentSummary {
            owner,
            raw_materials_note,
            packaging_note,
            last_comment,
            products,
        })
    }

    /// First comment of the supplier child task, or an empty note when the task or its comments are absent.
    async fn supplier_note(&self, label: ChildLabel, development: &TaskDetail) -> Result<String> {
        let Some(child) = self.rules.find(label, &development.sub_tasks) else {
            debug!("Task {} has no {:?} child", development.id, label);
            return Ok(String::new());
        };
        info!("Found {:?} task '{}' ({})", label, child.name, child.id);

        let child = self.client.get_task(&child.id).await?;
        match child.comments.first() {
            Some(comment) => Ok(clean_html(&self.client.get_comment(&comment.id).await)),
            None => Ok(String::new()),
        }
    }
}

fn launch_date(issue: &TaskDetail) -> Result<String> {
    let entity = format!("task {}", issue.id);
    let raw = issue
        .actual_start()
        .ok_or_else(|| ReportError::missing(entity.clone(), "actualStart"))?;
    format_launch_date(raw).ok_or_else(|| ReportError::InvalidDate {
        entity,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{ReportRoot, TreeAggregator};
    use crate::error::ReportError;
    use crate::hierarchy::HierarchyRules;
    use crate::test_support::{client_for, mock_data};
    use megaplan_api::Issue;
    use mockito::Server;
    use serde_json::json;

    fn root(issues: &[(&str, &str)]) -> ReportRoot {
        ReportRoot {
            name: "Бренд".to_string(),
            responsible: "Анна".to_string(),
            issues: issues
                .iter()
                .map(|(id, name)| Issue {
                    id: id.to_string(),
                    name: name.to_string(),
                })
                .collect(),
        }
    }

    async fn mock_issue_with_development(server: &mut Server) {
        mock_data(
            server,
            "/api/v3/task/100",
            json!({
                "id": "100",
                "name": "Линейка Роза",
                "subTasks": [
                    {"id": "101", "name": "Дизайн"},
                    {"id": "102", "name": "Разработка продуктов"}
                ],
                "actualStart": {"contentType": "DateTime", "value": "2024-03-05T10:00:00+03:00"}
            }),
        )
        .await;
        mock_data(
            server,
            "/api/v3/task/102",
            json!({
                "id": "102",
                "name": "Разработка продуктов",
                "subject": "<p>1 Крем 50 мл</p><p>2 Мыло 90 г</p>",
                "responsible": {"id": "7", "contentType": "Employee"},
                "comments": [{"id": "c1"}, {"id": "c2"}],
                "subTasks": [{"id": "103", "name": "1. Поставщики сырья"}]
            }),
        )
        .await;
        mock_data(server, "/api/v3/employee/7", json!({"id": "7", "name": "Ольга"})).await;
        mock_data(
            server,
            "/api/v3/task/103",
            json!({"id": "103", "name": "1. Поставщики сырья", "comments": [{"id": "c3"}, {"id": "c4"}]}),
        )
        .await;
        mock_data(server, "/api/v3/comment/c3", json!({"id": "c3", "content": "<p>Сырьё &amp; масла</p>"})).await;
    }

    #[tokio::test]
    async fn flattens_products_with_shared_issue_values() {
        let mut server = Server::new_async().await;
        mock_issue_with_development(&mut server).await;
        let failing_comment = server
            .mock("GET", "/api/v3/comment/c2")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;
        let unused_comments = server
            .mock("GET", mockito::Matcher::Regex("^/api/v3/comment/c[14]$".to_string()))
            .expect(0)
            .create_async()
            .await;

        let client = client_for(&server);
        let rules = HierarchyRules::default();
        let rows = TreeAggregator::new(&client, &rules)
            .collect(&root(&[("100", "Линейка Роза")]))
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].index, 1);
        assert_eq!(rows[1].index, 2);
        assert_eq!(rows[0].product_line, "1 Крем 50 мл");
        assert_eq!(rows[1].product_line, "2 Мыло 90 г");
        for row in &rows {
            assert_eq!(row.project_name, "Бренд");
            assert_eq!(row.issue_name, "Линейка Роза");
            assert_eq!(row.launch_date, "5 марта");
            assert_eq!(row.bm_responsible, "Анна");
            assert_eq!(row.oz_responsible, "Ольга");
            assert_eq!(row.raw_materials_note, "Сырьё & масла");
            assert_eq!(row.packaging_note, "");
            assert_eq!(row.last_comment, "");
        }
        failing_comment.assert_async().await;
        unused_comments.assert_async().await;
    }

    #[tokio::test]
    async fn issue_without_development_task_contributes_no_rows() {
        let mut server = Server::new_async().await;
        mock_data(
            &mut server,
            "/api/v3/task/200",
            json!({"id": "200", "name": "Маркетинг", "subTasks": [{"id": "201", "name": "Фотосессия"}]}),
        )
        .await;
        mock_issue_with_development(&mut server).await;
        server
            .mock("GET", "/api/v3/comment/c2")
            .with_status(404)
            .create_async()
            .await;

        let client = client_for(&server);
        let rules = HierarchyRules::default();
        let rows = TreeAggregator::new(&client, &rules)
            .collect(&root(&[("200", "Маркетинг"), ("100", "Линейка Роза")]))
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].index, 1);
        assert!(rows.iter().all(|row| row.issue_name == "Линейка Роза"));
    }

    #[tokio::test]
    async fn task_fetch_failure_aborts_collection() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v3/task/100")
            .with_status(500)
            .create_async()
            .await;

        let client = client_for(&server);
        let rules = HierarchyRules::default();
        let err = TreeAggregator::new(&client, &rules)
            .collect(&root(&[("100", "Линейка Роза")]))
            .await
            .unwrap_err();

        assert!(matches!(err, ReportError::Upstream(_)));
    }

    #[tokio::test]
    async fn missing_raw_materials_task_leaves_note_empty() {
        let mut server = Server::new_async().await;
        mock_data(
            &mut server,
            "/api/v3/task/400",
            json!({
                "id": "400",
                "name": "Линейка Лаванда",
                "subTasks": [{"id": "401", "name": "Разработка продуктов"}],
                "actualStart": {"value": "2024-12-31T09:00:00+03:00"}
            }),
        )
        .await;
        mock_data(
            &mut server,
            "/api/v3/task/401",
            json!({
                "id": "401",
                "subject": "Бальзам 200 мл",
                "owner": {"name": "Ольга"},
                "subTasks": [{"id": "402", "name": "2. Поставщики упаковки"}]
            }),
        )
        .await;
        mock_data(
            &mut server,
            "/api/v3/task/402",
            json!({"id": "402", "name": "2. Поставщики упаковки", "comments": [{"id": "c9"}]}),
        )
        .await;
        mock_data(&mut server, "/api/v3/comment/c9", json!({"id": "c9", "content": "Флаконы"})).await;

        let client = client_for(&server);
        let rules = HierarchyRules::default();
        let rows = TreeAggregator::new(&client, &rules)
            .collect(&root(&[("400", "Линейка Лаванда")]))
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].product_line, "Бальзам 200 мл");
        assert_eq!(rows[0].raw_materials_note, "");
        assert_eq!(rows[0].packaging_note, "Флаконы");
        assert_eq!(rows[0].oz_responsible, "Ольга");
        assert_eq!(rows[0].launch_date, "31 декабря");
    }

    #[tokio::test]
    async fn development_without_products_needs_no_start_date() {
        let mut server = Server::new_async().await;
        mock_data(
            &mut server,
            "/api/v3/task/500",
            json!({"id": "500", "name": "Линейка", "subTasks": [{"id": "501", "name": "Разработка продуктов"}]}),
        )
        .await;
        mock_data(
            &mut server,
            "/api/v3/task/501",
            json!({"id": "501", "subject": "<p>Описание линейки</p>", "responsible": {"name": "Ольга"}}),
        )
        .await;

        let client = client_for(&server);
        let rules = HierarchyRules::default();
        let rows = TreeAggregator::new(&client, &rules)
            .collect(&root(&[("500", "Линейка")]))
            .await
            .unwrap();

        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn products_without_start_date_are_a_structure_error() {
        let mut server = Server::new_async().await;
        mock_data(
            &mut server,
            "/api/v3/task/300",
            json!({"id": "300", "name": "Линейка", "subTasks": [{"id": "301", "name": "Разработка продуктов"}]}),
        )
        .await;
        mock_data(
            &mut server,
            "/api/v3/task/301",
            json!({"id": "301", "subject": "Крем 50 мл", "responsible": {"name": "Ольга"}}),
        )
        .await;

        let client = client_for(&server);
        let rules = HierarchyRules::default();
        let err = TreeAggregator::new(&client, &rules)
            .collect(&root(&[("300", "Линейка")]))
            .await
            .unwrap_err();

        assert!(matches!(err, ReportError::MissingField { field: "actualStart", .. }));
    }
}
