//! Subtask suggestion. The provider seam exists so a smarter backend can be
//! plugged in later; the built-in one works offline from the task text.

use anyhow::anyhow;
use regex::Regex;
use tracing::debug;

use crate::task::Task;

/// A proposed subtask, not yet stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtaskDraft {
    pub title: String,
    pub description: Option<String>,
}

pub trait SuggestionProvider {
    fn suggest_subtasks(&self, task: &Task) -> anyhow::Result<Vec<SubtaskDraft>>;
}

/// Derives subtasks from the task's own text: bullet or numbered lines in
/// the description become one subtask each; otherwise a generic scaffold is
/// proposed from the title.
#[derive(Debug, Clone)]
pub struct RuleBasedProvider {
    pub max_suggestions: usize,
}

impl Default for RuleBasedProvider {
    fn default() -> Self {
        Self { max_suggestions: 5 }
    }
}

impl SuggestionProvider for RuleBasedProvider {
    #[tracing::instrument(skip(self, task), fields(id = task.id))]
    fn suggest_subtasks(&self, task: &Task) -> anyhow::Result<Vec<SubtaskDraft>> {
        let bullet_re = Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+(?P<item>.+)$")
            .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

        let mut drafts = Vec::new();
        if let Some(description) = task.description.as_deref() {
            for line in description.lines() {
                if let Some(caps) = bullet_re.captures(line)
                    && let Some(item) = caps.name("item")
                {
                    let title = item.as_str().trim();
                    if !title.is_empty() {
                        drafts.push(SubtaskDraft {
                            title: title.to_string(),
                            description: None,
                        });
                    }
                }
                if drafts.len() == self.max_suggestions {
                    break;
                }
            }
        }

        if drafts.is_empty() {
            debug!(id = task.id, "no bullet items found, scaffolding from title");
            let title = task.title.trim();
            drafts = vec![
                SubtaskDraft {
                    title: format!("Plan: {title}"),
                    description: None,
                },
                SubtaskDraft {
                    title: format!("Work on: {title}"),
                    description: None,
                },
                SubtaskDraft {
                    title: format!("Review: {title}"),
                    description: None,
                },
            ];
        }

        Ok(drafts)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{RuleBasedProvider, SuggestionProvider};
    use crate::task::Task;

    fn task_with_description(description: Option<&str>) -> Task {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).single().expect("valid now");
        let mut task = Task::new(1, "Launch newsletter".to_string(), 1, now);
        task.description = description.map(|s| s.to_string());
        task
    }

    #[test]
    fn extracts_bullet_lines_in_order() {
        let task = task_with_description(Some(
            "Needs a few things:\n- Pick a platform\n* Draft the first issue\n3. Announce it",
        ));
        let drafts = RuleBasedProvider::default().suggest_subtasks(&task).expect("suggest");

        let titles: Vec<&str> = drafts.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["Pick a platform", "Draft the first issue", "Announce it"]);
    }

    #[test]
    fn caps_the_number_of_suggestions() {
        let bullets = (1..=10)
            .map(|n| format!("- Step {n}"))
            .collect::<Vec<_>>()
            .join("\n");
        let task = task_with_description(Some(&bullets));

        let drafts = RuleBasedProvider::default().suggest_subtasks(&task).expect("suggest");
        assert_eq!(drafts.len(), 5);
    }

    #[test]
    fn scaffolds_from_title_when_no_bullets() {
        let task = task_with_description(None);
        let drafts = RuleBasedProvider::default().suggest_subtasks(&task).expect("suggest");

        assert_eq!(drafts.len(), 3);
        assert!(drafts.iter().all(|d| d.title.contains("Launch newsletter")));
    }
}
