//! Dashboard aggregation
//!
//! Every call re-queries the store; the sub-queries run concurrently and are
//! not isolated from one another, so a dashboard computed during concurrent
//! writes may mix before and after states.

use serde::Serialize;

use crate::models::project::{ProjectFilter, ProjectStatus};
use crate::models::task::{TaskFilter, TaskPriority, TaskStatus, TaskView};
use crate::store::expand::expand_tasks;
use crate::store::{Store, StoreResult};

/// Number of tasks listed under `recentTasks`
pub const RECENT_TASK_COUNT: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub total_projects: i64,
    pub active_projects: i64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: TaskStatus,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriorityCount {
    pub priority: TaskPriority,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Charts {
    pub tasks_by_status: Vec<StatusCount>,
    pub tasks_by_priority: Vec<PriorityCount>,
}

/// `GET /api/analytics/dashboard` payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub summary: Summary,
    pub charts: Charts,
    pub recent_tasks: Vec<TaskView>,
}

/// Percentage of completed tasks rounded to one decimal; 0 with no tasks
pub fn completion_rate(completed: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let percent = completed as f64 / total as f64 * 100.0;
    (percent * 10.0).round() / 10.0
}

fn zero_filled<K, T>(
    all: impl IntoIterator<Item = K>,
    counts: &[(K, i64)],
    build: impl Fn(K, i64) -> T,
) -> Vec<T>
where
    K: Copy + PartialEq,
{
    all.into_iter()
        .map(|key| {
            let count = counts
                .iter()
                .find(|(k, _)| *k == key)
                .map_or(0, |(_, count)| *count);
            build(key, count)
        })
        .collect()
}

/// Computes the dashboard from a fresh snapshot of the store
pub async fn dashboard(store: &Store) -> StoreResult<Dashboard> {
    let completed_filter = TaskFilter {
        status: Some(TaskStatus::Completed),
        ..Default::default()
    };
    let active_filter = ProjectFilter {
        status: Some(ProjectStatus::Active),
        ..Default::default()
    };
    let all_tasks = TaskFilter::default();
    let all_projects = ProjectFilter::default();

    let (
        total_tasks,
        completed_tasks,
        total_projects,
        active_projects,
        by_status,
        by_priority,
        recent,
    ) = futures::try_join!(
        store.tasks.count(&all_tasks),
        store.tasks.count(&completed_filter),
        store.projects.count(&all_projects),
        store.projects.count(&active_filter),
        store.tasks.count_by_status(),
        store.tasks.count_by_priority(),
        store.tasks.recent(RECENT_TASK_COUNT),
    )?;

    let recent_tasks = expand_tasks(store.users.as_ref(), recent).await?;

    tracing::debug!(total_tasks, completed_tasks, total_projects, "Dashboard computed");

    Ok(Dashboard {
        summary: Summary {
            total_tasks,
            completed_tasks,
            total_projects,
            active_projects,
            completion_rate: completion_rate(completed_tasks, total_tasks),
        },
        charts: Charts {
            tasks_by_status: zero_filled(TaskStatus::ALL, &by_status, |status, count| {
                StatusCount { status, count }
            }),
            tasks_by_priority: zero_filled(TaskPriority::ALL, &by_priority, |priority, count| {
                PriorityCount { priority, count }
            }),
        },
        recent_tasks,
    })
}
