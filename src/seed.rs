// Demo fixture: the task set a fresh install starts with

use crate::models::{Priority, Status, Task, TaskId};
use chrono::{Days, NaiveDate};

const DAY_MS: i64 = 86_400_000;

struct Fixture {
    id: &'static str,
    parent: Option<&'static str>,
    title: &'static str,
    description: &'static str,
    notes: &'static str,
    priority: Priority,
    status: Status,
    tags: &'static [&'static str],
    color: &'static str,
    order: i64,
    /// Offsets in days relative to today
    due: i64,
    start: i64,
    created: i64,
    duration: u32,
}

const FIXTURES: &[Fixture] = &[
    Fixture {
        id: "1",
        parent: None,
        title: "Design System Architecture",
        description: "Plan and design the component architecture",
        notes: "Focus on reusability and scalability",
        priority: Priority::High,
        status: Status::InProgress,
        tags: &["design", "architecture"],
        color: "#3b82f6",
        order: 0,
        due: 0,
        start: -2,
        created: -3,
        duration: 5,
    },
    Fixture {
        id: "1-1",
        parent: Some("1"),
        title: "Create component library",
        description: "Build reusable UI components",
        notes: "",
        priority: Priority::High,
        status: Status::InProgress,
        tags: &["design"],
        color: "#3b82f6",
        order: 0,
        due: 0,
        start: -2,
        created: -2,
        duration: 2,
    },
    Fixture {
        id: "1-2",
        parent: Some("1"),
        title: "Define design tokens",
        description: "Colors, typography, spacing",
        notes: "",
        priority: Priority::Medium,
        status: Status::Completed,
        tags: &["design"],
        color: "#3b82f6",
        order: 1,
        due: 0,
        start: -2,
        created: -2,
        duration: 1,
    },
    Fixture {
        id: "2",
        parent: None,
        title: "API Integration",
        description: "Integrate backend APIs",
        notes: "",
        priority: Priority::Medium,
        status: Status::Todo,
        tags: &["development", "backend"],
        color: "#10b981",
        order: 1,
        due: 1,
        start: 0,
        created: -2,
        duration: 3,
    },
    Fixture {
        id: "3",
        parent: None,
        title: "Code Review",
        description: "Review pull requests from team",
        notes: "Check PR #234 and #235",
        priority: Priority::Urgent,
        status: Status::Todo,
        tags: &["review"],
        color: "#ef4444",
        order: 2,
        due: -1,
        start: -1,
        created: -4,
        duration: 1,
    },
    Fixture {
        id: "4",
        parent: None,
        title: "Documentation Update",
        description: "Update project documentation",
        notes: "",
        priority: Priority::Low,
        status: Status::Review,
        tags: &["documentation"],
        color: "#8b5cf6",
        order: 3,
        due: 7,
        start: 2,
        created: -1,
        duration: 4,
    },
    Fixture {
        id: "5",
        parent: None,
        title: "Testing Framework Setup",
        description: "Set up the unit and end-to-end test harness",
        notes: "Include E2E tests",
        priority: Priority::High,
        status: Status::Completed,
        tags: &["testing", "development"],
        color: "#f59e0b",
        order: 4,
        due: 0,
        start: -3,
        created: -5,
        duration: 2,
    },
];

fn shift(today: NaiveDate, days: i64) -> NaiveDate {
    let result = if days >= 0 {
        today.checked_add_days(Days::new(days as u64))
    } else {
        today.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    result.unwrap_or(today)
}

/// Demo tasks with dates relative to `today`, parents listed before children
///
/// Five root tasks (due today, tomorrow, yesterday, next week, and one
/// already completed today) plus two subtasks under the first.
pub fn demo_tasks(today: NaiveDate, now_ms: i64) -> Vec<Task> {
    FIXTURES
        .iter()
        .map(|f| Task {
            id: TaskId::from(f.id),
            title: f.title.to_string(),
            description: f.description.to_string(),
            notes: f.notes.to_string(),
            priority: f.priority,
            status: f.status,
            tags: f.tags.iter().map(|t| t.to_string()).collect(),
            color_label: Some(f.color.to_string()),
            parent_id: f.parent.map(TaskId::from),
            subtasks: Vec::new(),
            order: f.order,
            completed: f.status == Status::Completed,
            created_at: now_ms + f.created * DAY_MS,
            updated_at: now_ms,
            start_date: Some(shift(today, f.start)),
            due_date: Some(shift(today, f.due)),
            duration: f.duration,
        })
        .collect()
}
