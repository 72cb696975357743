use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use colored::{ColoredString, Colorize};
use eyre::{Result, eyre};
use std::path::PathBuf;
use taskforest::config::Config;
use taskforest::forest::TaskTree;
use taskforest::{
    Clock, NewTask, Priority, SortOption, Status, SystemClock, Task, TaskFilter, TaskStore, TaskUpdate, seed,
};

#[derive(Parser)]
#[command(name = "taskforest")]
#[command(about = "TaskForest CLI - hierarchical tasks with list, board, calendar and gantt views")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to the task snapshot (default: data_file from config)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to the config file (default: <config dir>/taskforest/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a task, root-level unless --parent is given
    Add {
        title: String,

        /// Create as the last subtask of this task
        #[arg(long)]
        parent: Option<String>,

        #[command(flatten)]
        fields: TaskFields,
    },

    /// Change fields of an existing task
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        completed: Option<bool>,

        #[command(flatten)]
        fields: TaskFields,

        #[arg(long, conflicts_with = "due")]
        clear_due: bool,

        #[arg(long, conflicts_with = "start")]
        clear_start: bool,

        #[arg(long, conflicts_with = "color")]
        clear_color: bool,
    },

    /// Flip a task between completed and todo
    Toggle { id: String },

    /// Delete a task and all of its subtasks
    Delete { id: String },

    /// Reparent a task; without --parent it becomes a root task
    Move {
        id: String,

        #[arg(long)]
        parent: Option<String>,

        #[arg(long, default_value_t = 0)]
        order: i64,
    },

    /// Show one task with its subtasks
    Show { id: String },

    /// Hierarchical list with filters and sorting
    List {
        /// Case-insensitive title search
        #[arg(short = 'q', long)]
        search: Option<String>,

        #[arg(short, long = "status")]
        statuses: Vec<Status>,

        #[arg(short, long = "priority")]
        priorities: Vec<Priority>,

        #[arg(short, long = "tag")]
        tags: Vec<String>,

        #[arg(long)]
        due_from: Option<NaiveDate>,

        #[arg(long)]
        due_until: Option<NaiveDate>,

        /// due-date, priority, status, created-at or custom
        #[arg(long)]
        sort: Option<SortOption>,

        /// Print the filtered tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Open tasks due today
    Today,

    /// Open tasks past their due date
    Overdue,

    /// Kanban columns by status
    Board,

    /// Tasks due on a day (default: today)
    Calendar {
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Scheduled tasks on a timeline
    Gantt,

    /// Dashboard statistics
    Stats,

    /// Load the demo task set
    Seed {
        /// Replace existing tasks
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug, Default)]
struct TaskFields {
    #[arg(long)]
    description: Option<String>,

    #[arg(long)]
    notes: Option<String>,

    #[arg(short, long)]
    priority: Option<Priority>,

    #[arg(short, long)]
    status: Option<Status>,

    /// Repeat for several tags
    #[arg(short, long = "tag")]
    tags: Vec<String>,

    #[arg(long)]
    color: Option<String>,

    #[arg(long)]
    order: Option<i64>,

    #[arg(long)]
    start: Option<NaiveDate>,

    #[arg(long)]
    due: Option<NaiveDate>,

    /// Length in days
    #[arg(long)]
    duration: Option<u32>,
}

impl TaskFields {
    fn into_new_task(self, title: String) -> NewTask {
        let mut task = NewTask::new(title);
        task.description = self.description.unwrap_or_default();
        task.notes = self.notes.unwrap_or_default();
        task.priority = self.priority.unwrap_or_default();
        task.status = self.status.unwrap_or_default();
        task.tags = self.tags;
        task.color_label = self.color;
        task.order = self.order.unwrap_or_default();
        task.start_date = self.start;
        task.due_date = self.due;
        task.duration = self.duration.unwrap_or(1);
        task
    }

    fn into_update(self) -> TaskUpdate {
        TaskUpdate {
            description: self.description,
            notes: self.notes,
            priority: self.priority,
            status: self.status,
            tags: (!self.tags.is_empty()).then_some(self.tags),
            color_label: self.color.map(Some),
            order: self.order,
            start_date: self.start.map(Some),
            due_date: self.due.map(Some),
            duration: self.duration,
            ..TaskUpdate::default()
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;

    // Setup tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(config.log_level()?)
        .init();

    let path = cli.file.unwrap_or_else(|| config.data_file.clone());
    let mut store = TaskStore::load(&path, SystemClock)?;
    store.set_sort_option(config.default_sort);

    let revision = store.revision();
    run(&mut store, cli.command)?;

    if store.revision() != revision {
        store.save(&path)?;
    }

    Ok(())
}

fn run(store: &mut TaskStore, command: Commands) -> Result<()> {
    match command {
        Commands::Add { title, parent, fields } => {
            let title = validate_title(&title)?;
            let data = fields.into_new_task(title);
            let id = match parent {
                Some(parent) => store.add_subtask(&parent, data)?,
                None => store.add_task(data),
            };
            println!("Created {}", id.to_string().cyan());
        }
        Commands::Edit {
            id,
            title,
            completed,
            fields,
            clear_due,
            clear_start,
            clear_color,
        } => {
            let mut update = fields.into_update();
            update.title = title.as_deref().map(validate_title).transpose()?;
            update.completed = completed;
            if clear_due {
                update.due_date = Some(None);
            }
            if clear_start {
                update.start_date = Some(None);
            }
            if clear_color {
                update.color_label = Some(None);
            }
            if update.is_empty() {
                return Err(eyre!("Nothing to change for {}", id));
            }
            store.update_task(&id, update)?;
            println!("Updated {}", id.cyan());
        }
        Commands::Toggle { id } => {
            let completed = store.toggle_task_complete(&id)?;
            let state = if completed { "completed".green() } else { "reopened".yellow() };
            println!("{} {}", id.cyan(), state);
        }
        Commands::Delete { id } => {
            let removed = store.delete_task(&id)?;
            println!("Deleted {} ({} task(s))", id.cyan(), removed.len());
        }
        Commands::Move { id, parent, order } => {
            store.move_task(&id, parent.as_deref(), order)?;
            match parent {
                Some(parent) => println!("Moved {} under {}", id.cyan(), parent.cyan()),
                None => println!("Moved {} to the top level", id.cyan()),
            }
        }
        Commands::Show { id } => {
            let tree = store
                .forest()
                .subtree(&id)
                .ok_or_else(|| eyre!("task not found: {}", id))?;
            print_details(&tree.task);
            if tree.task.has_subtasks() {
                println!();
                print_tree(&tree.subtasks, 0, store.clock().today());
            }
        }
        Commands::List {
            search,
            statuses,
            priorities,
            tags,
            due_from,
            due_until,
            sort,
            json,
        } => {
            store.set_filter(TaskFilter {
                search: search.filter(|q| !q.trim().is_empty()),
                statuses,
                priorities,
                tags,
                due_from,
                due_until,
            });
            if let Some(sort) = sort {
                store.set_sort_option(sort);
            }

            let view = store.list_view();
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else if view.is_empty() {
                println!("{}", "No tasks match".dimmed());
            } else {
                print_tree(&view, 0, store.clock().today());
            }
        }
        Commands::Today => {
            let today = store.clock().today();
            print_flat(&format!("Today ({})", today), &store.today_tasks(), today);
        }
        Commands::Overdue => {
            let today = store.clock().today();
            print_flat("Overdue", &store.overdue_tasks(), today);
        }
        Commands::Board => {
            let today = store.clock().today();
            for (status, tasks) in store.forest().by_status() {
                print_flat(&format!("{} ({})", status.label(), tasks.len()), &tasks, today);
                println!();
            }
        }
        Commands::Calendar { date } => {
            let today = store.clock().today();
            let date = date.unwrap_or(today);
            print_flat(&date.format("%A, %B %-d, %Y").to_string(), &store.forest().due_on(date), today);
        }
        Commands::Gantt => print_gantt(store),
        Commands::Stats => {
            let stats = store.dashboard();
            println!("{}", "Dashboard".bold());
            println!(
                "  {} of {} tasks completed ({}%)",
                stats.completed, stats.total, stats.progress_percentage
            );
            println!(
                "  todo {}  in progress {}  review {}",
                stats.todo, stats.in_progress, stats.review
            );
            println!("  due today {}  overdue {}", stats.due_today, stats.overdue.to_string().red());
            println!("{}", "By priority".bold());
            for (priority, count) in &stats.by_priority {
                println!("  {:<8} {}", priority_label(*priority), count);
            }
        }
        Commands::Seed { force } => {
            if !store.forest().is_empty() && !force {
                return Err(eyre!("Store already has tasks; use --force to replace them"));
            }
            let tasks = seed::demo_tasks(store.clock().today(), store.clock().now_ms());
            let count = store.replace_all(tasks)?;
            println!("Seeded {} tasks", count);
        }
    }

    Ok(())
}

fn validate_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(eyre!("Task title cannot be empty"));
    }
    Ok(trimmed.to_string())
}

fn status_mark(task: &Task) -> ColoredString {
    match task.status {
        Status::Todo => "[ ]".normal(),
        Status::InProgress => "[~]".blue(),
        Status::Review => "[?]".magenta(),
        Status::Completed => "[x]".green(),
    }
}

fn priority_label(priority: Priority) -> ColoredString {
    match priority {
        Priority::Low => "low".dimmed(),
        Priority::Medium => "medium".normal(),
        Priority::High => "high".yellow(),
        Priority::Urgent => "urgent".red().bold(),
    }
}

fn due_label(task: &Task, today: NaiveDate) -> ColoredString {
    match task.due_date {
        None => "".normal(),
        Some(due) if !task.completed && due < today => format!("due {}", due).red(),
        Some(due) if due == today => "due today".yellow(),
        Some(due) => format!("due {}", due).normal(),
    }
}

fn task_line(task: &Task, today: NaiveDate) -> String {
    let title = if task.completed {
        task.title.strikethrough().dimmed()
    } else {
        task.title.normal()
    };
    let tags = if task.tags.is_empty() {
        String::new()
    } else {
        format!(" #{}", task.tags.join(" #"))
    };
    format!(
        "{} {} {} {} {}{}",
        status_mark(task),
        title,
        priority_label(task.priority),
        due_label(task, today),
        task.id.to_string().dimmed(),
        tags.cyan()
    )
}

fn print_tree(trees: &[TaskTree], depth: usize, today: NaiveDate) {
    for node in trees {
        println!("{}{}", "  ".repeat(depth), task_line(&node.task, today));
        print_tree(&node.subtasks, depth + 1, today);
    }
}

fn print_flat(heading: &str, tasks: &[&Task], today: NaiveDate) {
    println!("{}", heading.bold());
    if tasks.is_empty() {
        println!("  {}", "nothing here".dimmed());
    }
    for task in tasks {
        println!("  {}", task_line(task, today));
    }
}

fn print_details(task: &Task) {
    println!("{} {}", status_mark(task), task.title.bold());
    println!("  id        {}", task.id);
    if let Some(parent) = &task.parent_id {
        println!("  parent    {}", parent);
    }
    println!("  status    {}", task.status);
    println!("  priority  {}", priority_label(task.priority));
    if !task.description.is_empty() {
        println!("  about     {}", task.description);
    }
    if !task.notes.is_empty() {
        println!("  notes     {}", task.notes);
    }
    if !task.tags.is_empty() {
        println!("  tags      {}", task.tags.join(", "));
    }
    if let Some(color) = &task.color_label {
        println!("  color     {}", color);
    }
    if let Some(start) = task.start_date {
        println!("  start     {}", start);
    }
    if let Some(due) = task.due_date {
        println!("  due       {}", due);
    }
    println!("  duration  {} day(s)", task.duration);
    println!("  order     {}", task.order);
}

fn print_gantt(store: &TaskStore) {
    let forest = store.forest();
    let Some(timeline) = forest.timeline() else {
        println!("{}", "No scheduled tasks".dimmed());
        return;
    };

    println!(
        "{} {} .. {} ({} days)",
        "Timeline".bold(),
        timeline.start,
        timeline.end,
        timeline.total_days
    );
    let width = forest.scheduled().iter().map(|t| t.title.chars().count()).max().unwrap_or(0);
    for task in forest.scheduled() {
        let Some((offset, length)) = timeline.bar(task) else {
            continue;
        };
        let bar: String = (0..timeline.total_days)
            .map(|day| if day >= offset && day < offset + length { '#' } else { '.' })
            .collect();
        let bar = if task.completed { bar.green() } else { bar.blue() };
        println!("{:<width$} {}", task.title, bar, width = width);
    }
}
