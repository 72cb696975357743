// Dashboard statistics derived from the flattened forest

use crate::forest::Forest;
use crate::models::{Priority, Status};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub todo: usize,
    pub review: usize,
    pub due_today: usize,
    pub overdue: usize,
    /// `completed / total` as a rounded percentage; 0 for an empty forest
    pub progress_percentage: u8,
    /// Status buckets in status order, empty buckets dropped
    pub by_status: Vec<(Status, usize)>,
    /// Every priority, low to urgent
    pub by_priority: Vec<(Priority, usize)>,
}

pub fn dashboard(forest: &Forest, today: NaiveDate) -> DashboardStats {
    let all = forest.all_tasks();
    let total = all.len();
    let count_status = |status: Status| all.iter().filter(|t| t.status == status).count();

    let completed = all.iter().filter(|t| t.completed).count();
    let progress_percentage = if total == 0 {
        0
    } else {
        ((completed as f64 / total as f64) * 100.0).round() as u8
    };

    DashboardStats {
        total,
        completed,
        in_progress: count_status(Status::InProgress),
        todo: count_status(Status::Todo),
        review: count_status(Status::Review),
        due_today: forest.today_tasks(today).len(),
        overdue: forest.overdue_tasks(today).len(),
        progress_percentage,
        by_status: Status::ALL
            .into_iter()
            .map(|s| (s, count_status(s)))
            .filter(|(_, n)| *n > 0)
            .collect(),
        by_priority: Priority::ALL
            .into_iter()
            .map(|p| (p, all.iter().filter(|t| t.priority == p).count()))
            .collect(),
    }
}
