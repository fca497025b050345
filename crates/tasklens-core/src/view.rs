//! The view-derivation engine: given the full task collection and a view
//! configuration, compute what a view should display. Everything here is
//! pure; `now` is always injected by the caller and inputs are never
//! mutated.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use crate::datetime::to_local_date;
use crate::task::{Category, Priority, Status, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Priority,
    DueDate,
    Title,
    Category,
    Created,
}

impl SortKey {
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "priority" | "pri" => Some(Self::Priority),
            "due" | "duedate" => Some(Self::DueDate),
            "title" => Some(Self::Title),
            "category" | "cat" => Some(Self::Category),
            "created" => Some(Self::Created),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Priority => "priority",
            Self::DueDate => "due",
            Self::Title => "title",
            Self::Category => "category",
            Self::Created => "created",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewType {
    List,
    Board,
    Calendar,
    Card,
}

impl ViewType {
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "list" => Some(Self::List),
            "board" => Some(Self::Board),
            "calendar" => Some(Self::Calendar),
            "card" => Some(Self::Card),
            _ => None,
        }
    }
}

/// The user-controlled display parameters, independent of task data.
#[derive(Debug, Clone)]
pub struct ViewConfig {
    pub view: ViewType,
    pub sort_by: SortKey,
    pub show_completed: bool,
    /// Category ids to keep; empty means no category filtering.
    pub categories: BTreeSet<u64>,
    /// Case-insensitive substring matched against title and description;
    /// empty means no search filtering.
    pub search_query: String,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            view: ViewType::List,
            sort_by: SortKey::Priority,
            show_completed: false,
            categories: BTreeSet::new(),
            search_query: String::new(),
        }
    }
}

/// Which task classes focus mode surfaces. When active, these rules replace
/// the standard filters entirely.
#[derive(Debug, Clone, Copy)]
pub struct FocusSettings {
    pub show_high_priority: bool,
    pub show_today_tasks: bool,
    pub show_medium_priority: bool,
    pub duration_minutes: u32,
}

impl Default for FocusSettings {
    fn default() -> Self {
        Self {
            show_high_priority: true,
            show_today_tasks: true,
            show_medium_priority: false,
            duration_minutes: 60,
        }
    }
}

/// Dashboard counts. The four predicates are independent; a task can be
/// counted by several of them at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub today: usize,
    pub completed_today: usize,
    pub overdue: usize,
    pub upcoming: usize,
}

/// Derived sequence partitioned by status for the board view, each bucket
/// preserving the derived order.
#[derive(Debug, Clone, Default)]
pub struct StatusGroups {
    pub todo: Vec<Task>,
    pub in_progress: Vec<Task>,
    pub completed: Vec<Task>,
}

/// Computes the filtered, sorted sequence a view should display.
///
/// `categories` supplies the id-to-name mapping the `Category` sort key
/// needs. When `focus` is supplied its rules replace the standard filters,
/// and the filtered input order is kept (focus mode presents one task at a
/// time; see [`select_focus_task`]).
pub fn derive_visible_tasks(
    tasks: &[Task],
    categories: &[Category],
    config: &ViewConfig,
    focus: Option<&FocusSettings>,
    now: DateTime<Utc>,
) -> Vec<Task> {
    let mut rows: Vec<Task> = match focus {
        Some(settings) => tasks
            .iter()
            .filter(|task| matches_focus(task, settings, now))
            .cloned()
            .collect(),
        None => tasks
            .iter()
            .filter(|task| matches_standard(task, config))
            .cloned()
            .collect(),
    };

    if focus.is_none() {
        let names: HashMap<u64, &str> = categories
            .iter()
            .map(|category| (category.id, category.name.as_str()))
            .collect();
        sort_tasks(&mut rows, config.sort_by, &names);
    }

    rows
}

fn matches_standard(task: &Task, config: &ViewConfig) -> bool {
    if !config.show_completed && task.is_completed() {
        return false;
    }

    if !config.categories.is_empty() {
        // A category filter excludes uncategorized tasks.
        match task.category_id {
            Some(id) if config.categories.contains(&id) => {}
            _ => return false,
        }
    }

    if !config.search_query.is_empty() {
        let query = config.search_query.to_lowercase();
        let in_title = task.title.to_lowercase().contains(&query);
        let in_description = task
            .description
            .as_deref()
            .map(|text| text.to_lowercase().contains(&query))
            .unwrap_or(false);
        if !in_title && !in_description {
            return false;
        }
    }

    true
}

// An OR-union of the enabled rules. Completed tasks are not excluded here;
// the rules look only at priority and due day (see the focus tests).
fn matches_focus(task: &Task, settings: &FocusSettings, now: DateTime<Utc>) -> bool {
    if settings.show_high_priority && task.priority == Priority::High {
        return true;
    }

    if settings.show_today_tasks
        && let Some(due) = task.due_date
        && to_local_date(due) == to_local_date(now)
    {
        return true;
    }

    settings.show_medium_priority && task.priority == Priority::Medium
}

// All comparators return Equal for true ties so that the stable sort keeps
// input order; callers depend on that for deterministic secondary ordering.
fn sort_tasks(rows: &mut [Task], key: SortKey, category_names: &HashMap<u64, &str>) {
    match key {
        SortKey::Priority => rows.sort_by(|a, b| {
            a.priority
                .rank()
                .cmp(&b.priority.rank())
                .then_with(|| cmp_optional(a.due_date.as_ref(), b.due_date.as_ref()))
        }),
        SortKey::DueDate => {
            rows.sort_by(|a, b| cmp_optional(a.due_date.as_ref(), b.due_date.as_ref()))
        }
        SortKey::Title => {
            rows.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
        }
        SortKey::Category => rows.sort_by(|a, b| {
            category_sort_name(a, category_names).cmp(category_sort_name(b, category_names))
        }),
        SortKey::Created => rows.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
}

// Missing or dangling category references compare as the empty string, so
// uncategorized tasks sort first under the category key.
fn category_sort_name<'a>(task: &Task, names: &HashMap<u64, &'a str>) -> &'a str {
    task.category_id
        .and_then(|id| names.get(&id).copied())
        .unwrap_or("")
}

fn cmp_optional<T: Ord>(left: Option<&T>, right: Option<&T>) -> Ordering {
    match (left, right) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Picks the task a focus session should present next: the first incomplete
/// high-priority task in collection order, else the first incomplete task,
/// excluding `current` in both passes. `None` means every task is done.
pub fn select_focus_task(tasks: &[Task], current: Option<u64>) -> Option<&Task> {
    let candidate = |task: &&Task| !task.is_completed() && Some(task.id) != current;

    tasks
        .iter()
        .find(|task| candidate(task) && task.priority == Priority::High)
        .or_else(|| tasks.iter().find(candidate))
}

/// Computes the four dashboard counts in independent passes.
pub fn summarize(tasks: &[Task], now: DateTime<Utc>) -> Summary {
    let today = to_local_date(now);

    Summary {
        today: tasks
            .iter()
            .filter(|task| task.due_date.is_some_and(|due| to_local_date(due) == today))
            .count(),
        completed_today: tasks
            .iter()
            .filter(|task| {
                task.is_completed()
                    && task
                        .completed_at
                        .is_some_and(|done| to_local_date(done) == today)
            })
            .count(),
        overdue: tasks
            .iter()
            .filter(|task| !task.is_completed() && task.due_date.is_some_and(|due| due < now))
            .count(),
        upcoming: tasks
            .iter()
            .filter(|task| {
                !task.is_completed() && task.due_date.is_some_and(|due| to_local_date(due) > today)
            })
            .count(),
    }
}

pub fn group_by_status(tasks: &[Task]) -> StatusGroups {
    let mut groups = StatusGroups::default();
    for task in tasks {
        match task.status {
            Status::Todo => groups.todo.push(task.clone()),
            Status::InProgress => groups.in_progress.push(task.clone()),
            Status::Completed => groups.completed.push(task.clone()),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::{
        FocusSettings, SortKey, Summary, ViewConfig, derive_visible_tasks, group_by_status,
        select_focus_task, summarize,
    };
    use crate::task::{Category, Priority, Status, Task};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).single().expect("valid now")
    }

    fn day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 9, 0, 0).single().expect("valid day")
    }

    fn task(id: u64, title: &str, priority: Priority, due: Option<DateTime<Utc>>) -> Task {
        let mut t = Task::new(id, title.to_string(), 1, fixed_now());
        t.priority = priority;
        t.due_date = due;
        t
    }

    fn completed(mut t: Task) -> Task {
        t.complete(fixed_now());
        t
    }

    fn category(id: u64, name: &str) -> Category {
        Category {
            id,
            name: name.to_string(),
            color: "#4338ca".to_string(),
            user_id: 1,
            created_at: fixed_now(),
        }
    }

    fn ids(rows: &[Task]) -> Vec<u64> {
        rows.iter().map(|t| t.id).collect()
    }

    #[test]
    fn empty_collection_yields_empty_everything() {
        let config = ViewConfig::default();
        assert!(derive_visible_tasks(&[], &[], &config, None, fixed_now()).is_empty());
        assert_eq!(summarize(&[], fixed_now()), Summary::default());
        assert!(select_focus_task(&[], None).is_none());
    }

    #[test]
    fn hides_completed_tasks_unless_requested() {
        let tasks = vec![
            task(1, "Open", Priority::Medium, None),
            completed(task(2, "Done", Priority::Medium, None)),
        ];
        let mut config = ViewConfig::default();

        assert_eq!(ids(&derive_visible_tasks(&tasks, &[], &config, None, fixed_now())), vec![1]);

        config.show_completed = true;
        assert_eq!(
            ids(&derive_visible_tasks(&tasks, &[], &config, None, fixed_now())),
            vec![1, 2]
        );
    }

    #[test]
    fn category_filter_excludes_uncategorized_tasks() {
        let mut a = task(1, "Work item", Priority::Medium, None);
        a.category_id = Some(10);
        let mut b = task(2, "Other item", Priority::Medium, None);
        b.category_id = Some(20);
        let c = task(3, "Loose item", Priority::Medium, None);

        let mut config = ViewConfig::default();
        config.categories.insert(10);

        let rows = derive_visible_tasks(&[a, b, c], &[], &config, None, fixed_now());
        assert_eq!(ids(&rows), vec![1]);
    }

    #[test]
    fn search_matches_title_or_description_case_insensitively() {
        let mut a = task(1, "Draft report", Priority::Medium, None);
        a.description = Some("Quarterly numbers".to_string());
        let b = task(2, "Buy groceries", Priority::Medium, None);

        let mut config = ViewConfig::default();
        config.search_query = "REPORT".to_string();
        assert_eq!(
            ids(&derive_visible_tasks(&[a.clone(), b.clone()], &[], &config, None, fixed_now())),
            vec![1]
        );

        config.search_query = "quarterly".to_string();
        assert_eq!(
            ids(&derive_visible_tasks(&[a, b], &[], &config, None, fixed_now())),
            vec![1]
        );
    }

    #[test]
    fn priority_sort_breaks_ties_by_due_date() {
        // A and B share a priority; B is due earlier and must come first.
        let a = task(1, "A", Priority::High, Some(day(2024, 6, 12)));
        let b = task(2, "B", Priority::High, Some(day(2024, 6, 11)));
        let c = task(3, "C", Priority::Medium, Some(day(2024, 6, 11)));

        let rows = derive_visible_tasks(&[a, b, c], &[], &ViewConfig::default(), None, fixed_now());
        assert_eq!(ids(&rows), vec![2, 1, 3]);
    }

    #[test]
    fn priority_sort_is_stable_for_full_ties() {
        let a = task(1, "First", Priority::Medium, Some(day(2024, 6, 11)));
        let b = task(2, "Second", Priority::Medium, Some(day(2024, 6, 11)));
        let c = task(3, "Third", Priority::Medium, None);
        let d = task(4, "Fourth", Priority::Medium, None);

        let rows = derive_visible_tasks(
            &[a, b, c, d],
            &[],
            &ViewConfig::default(),
            None,
            fixed_now(),
        );
        // Equal due dates keep input order; both no-due tasks trail in order.
        assert_eq!(ids(&rows), vec![1, 2, 3, 4]);
    }

    #[test]
    fn due_date_sort_puts_missing_due_dates_last() {
        let a = task(1, "A", Priority::Medium, None);
        let b = task(2, "B", Priority::Medium, Some(day(2024, 6, 11)));

        let mut config = ViewConfig::default();
        config.sort_by = SortKey::DueDate;

        let rows = derive_visible_tasks(&[a, b], &[], &config, None, fixed_now());
        assert_eq!(ids(&rows), vec![2, 1]);
    }

    #[test]
    fn title_sort_is_case_insensitive() {
        let a = task(1, "banana", Priority::Medium, None);
        let b = task(2, "Apple", Priority::Medium, None);

        let mut config = ViewConfig::default();
        config.sort_by = SortKey::Title;

        let rows = derive_visible_tasks(&[a, b], &[], &config, None, fixed_now());
        assert_eq!(ids(&rows), vec![2, 1]);
    }

    #[test]
    fn category_sort_missing_category_first() {
        let mut a = task(1, "Has category", Priority::Medium, None);
        a.category_id = Some(10);
        let b = task(2, "No category", Priority::Medium, None);
        let mut c = task(3, "Dangling category", Priority::Medium, None);
        c.category_id = Some(99);

        let mut config = ViewConfig::default();
        config.sort_by = SortKey::Category;
        let categories = vec![category(10, "Work")];

        let rows = derive_visible_tasks(&[a, b, c], &categories, &config, None, fixed_now());
        // Missing and dangling references key as "" and precede "Work",
        // keeping their relative input order.
        assert_eq!(ids(&rows), vec![2, 3, 1]);
    }

    #[test]
    fn created_sort_is_newest_first() {
        let mut a = task(1, "Old", Priority::Medium, None);
        a.created_at = day(2024, 6, 1);
        let mut b = task(2, "New", Priority::Medium, None);
        b.created_at = day(2024, 6, 9);

        let mut config = ViewConfig::default();
        config.sort_by = SortKey::Created;

        let rows = derive_visible_tasks(&[a, b], &[], &config, None, fixed_now());
        assert_eq!(ids(&rows), vec![2, 1]);
    }

    #[test]
    fn output_is_a_permutation_with_fields_untouched() {
        let mut a = task(1, "Alpha", Priority::Low, Some(day(2024, 6, 15)));
        a.description = Some("keep me".to_string());
        let b = task(2, "Beta", Priority::High, None);
        let input = vec![a.clone(), b.clone()];

        let rows = derive_visible_tasks(&input, &[], &ViewConfig::default(), None, fixed_now());

        assert_eq!(rows.len(), 2);
        assert_eq!(input, vec![a.clone(), b.clone()]);
        let found = rows.iter().find(|t| t.id == 1).expect("task 1 present");
        assert_eq!(found, &a);
    }

    #[test]
    fn derivation_is_idempotent() {
        let tasks = vec![
            task(1, "A", Priority::Low, Some(day(2024, 6, 15))),
            task(2, "B", Priority::High, None),
            completed(task(3, "C", Priority::Medium, Some(day(2024, 6, 10)))),
        ];
        let mut config = ViewConfig::default();
        config.show_completed = true;

        let first = derive_visible_tasks(&tasks, &[], &config, None, fixed_now());
        let second = derive_visible_tasks(&tasks, &[], &config, None, fixed_now());
        assert_eq!(first, second);
    }

    #[test]
    fn focus_mode_overrides_standard_filters() {
        let mut high = task(1, "High", Priority::High, None);
        high.category_id = Some(77);
        let low_today = task(2, "Low due today", Priority::Low, Some(fixed_now()));
        let medium = task(3, "Medium", Priority::Medium, None);

        // Standard filters that would otherwise exclude everything.
        let mut config = ViewConfig::default();
        config.show_completed = false;
        config.categories.insert(5);
        config.search_query = "nothing matches this".to_string();

        let focus = FocusSettings {
            show_high_priority: true,
            show_today_tasks: false,
            show_medium_priority: false,
            duration_minutes: 60,
        };

        let rows = derive_visible_tasks(
            &[high, low_today, medium],
            &[],
            &config,
            Some(&focus),
            fixed_now(),
        );
        assert_eq!(ids(&rows), vec![1]);
    }

    #[test]
    fn focus_mode_unions_independent_rules() {
        let high = task(1, "High", Priority::High, None);
        let low_today = task(2, "Low due today", Priority::Low, Some(fixed_now()));
        let medium = task(3, "Medium", Priority::Medium, None);
        let low = task(4, "Low", Priority::Low, None);

        let focus = FocusSettings {
            show_high_priority: true,
            show_today_tasks: true,
            show_medium_priority: true,
            duration_minutes: 60,
        };

        let rows = derive_visible_tasks(
            &[high, low_today, medium, low],
            &[],
            &ViewConfig::default(),
            Some(&focus),
            fixed_now(),
        );
        assert_eq!(ids(&rows), vec![1, 2, 3]);
    }

    #[test]
    fn focus_mode_includes_completed_tasks() {
        // The focus rules check priority and due day only, so a completed
        // high-priority task still surfaces.
        let done_high = completed(task(1, "Done high", Priority::High, None));
        let open_low = task(2, "Open low", Priority::Low, None);

        let focus = FocusSettings {
            show_high_priority: true,
            show_today_tasks: false,
            show_medium_priority: false,
            duration_minutes: 60,
        };

        let rows = derive_visible_tasks(
            &[done_high, open_low],
            &[],
            &ViewConfig::default(),
            Some(&focus),
            fixed_now(),
        );
        assert_eq!(ids(&rows), vec![1]);
    }

    #[test]
    fn summary_counts_overdue_by_instant_and_upcoming_by_day() {
        let now = fixed_now(); // 2024-06-10T12:00Z
        let overdue = task(
            1,
            "Overdue",
            Priority::Medium,
            Some(Utc.with_ymd_and_hms(2024, 6, 9, 23, 0, 0).single().expect("valid due")),
        );
        let later_today = task(
            2,
            "Later today",
            Priority::Medium,
            Some(Utc.with_ymd_and_hms(2024, 6, 10, 18, 0, 0).single().expect("valid due")),
        );
        let next_week = task(3, "Next week", Priority::Medium, Some(day(2024, 6, 17)));

        let summary = summarize(&[overdue, later_today, next_week], now);
        assert_eq!(summary.overdue, 1);
        assert_eq!(summary.upcoming, 1);
        // "Later today" is due today but neither overdue nor upcoming.
        assert_eq!(summary.today, 1);
    }

    #[test]
    fn summary_predicates_are_independent() {
        // Completed this morning with a due date today: counts toward both
        // today and completed_today.
        let mut done = task(1, "Done today", Priority::Medium, Some(fixed_now()));
        done.complete(Utc.with_ymd_and_hms(2024, 6, 10, 8, 0, 0).single().expect("valid instant"));

        let summary = summarize(&[done], fixed_now());
        assert_eq!(summary.today, 1);
        assert_eq!(summary.completed_today, 1);
        assert_eq!(summary.overdue, 0);
        assert_eq!(summary.upcoming, 0);
    }

    #[test]
    fn summary_tolerates_missing_completion_timestamp() {
        // Malformed record: completed status without completedAt. It must
        // never count as completed today.
        let mut odd = task(1, "Odd", Priority::Medium, None);
        odd.status = Status::Completed;
        odd.completed = true;
        odd.completed_at = None;

        let summary = summarize(&[odd], fixed_now());
        assert_eq!(summary.completed_today, 0);
    }

    #[test]
    fn select_focus_task_prefers_first_high_priority() {
        let tasks = vec![
            task(1, "Low", Priority::Low, None),
            task(2, "High A", Priority::High, None),
            task(3, "High B", Priority::High, None),
        ];
        assert_eq!(select_focus_task(&tasks, None).map(|t| t.id), Some(2));
    }

    #[test]
    fn select_focus_task_falls_back_to_first_incomplete() {
        let tasks = vec![
            task(1, "Low", Priority::Low, None),
            completed(task(2, "High done", Priority::High, None)),
        ];
        assert_eq!(select_focus_task(&tasks, None).map(|t| t.id), Some(1));
    }

    #[test]
    fn select_focus_task_skips_the_current_task() {
        let tasks = vec![
            task(1, "High A", Priority::High, None),
            task(2, "High B", Priority::High, None),
        ];
        assert_eq!(select_focus_task(&tasks, Some(1)).map(|t| t.id), Some(2));
    }

    #[test]
    fn select_focus_task_returns_none_when_all_done() {
        let tasks = vec![
            completed(task(1, "A", Priority::High, None)),
            completed(task(2, "B", Priority::Low, None)),
        ];
        assert!(select_focus_task(&tasks, None).is_none());
    }

    #[test]
    fn group_by_status_preserves_derived_order() {
        let mut doing = task(2, "Doing", Priority::Medium, None);
        doing.set_status(Status::InProgress, fixed_now());
        let tasks = vec![
            task(1, "First todo", Priority::Medium, None),
            doing,
            task(3, "Second todo", Priority::Medium, None),
            completed(task(4, "Done", Priority::Medium, None)),
        ];

        let groups = group_by_status(&tasks);
        assert_eq!(ids(&groups.todo), vec![1, 3]);
        assert_eq!(ids(&groups.in_progress), vec![2]);
        assert_eq!(ids(&groups.completed), vec![4]);
    }
}
