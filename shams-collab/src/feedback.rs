use std::collections::BTreeMap;

use log::info;
use serde::Serialize;
use shams_core::Rating;

use crate::{
    access::{require_staff, require_student},
    error::{check_optional_text, WorkflowError},
    CollabContext, MessFeedbackData, NewFeedback, UserData, WorkflowResult,
};

const MENU_ITEM_LENGTH: usize = 128;
const COMMENTS_LENGTH: usize = 1000;

/// Mess ratings left by students
pub struct FeedbackManager {
    context: CollabContext,
}

#[derive(Debug, Clone)]
pub struct FeedbackDraft {
    pub menu_item: Option<String>,
    /// Checked to be within 1..=5 on submission
    pub rating: i32,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSummary {
    pub count: usize,
    /// `None` until the first rating arrives
    pub average: Option<f64>,
    /// Number of ratings per star, index 0 is one star
    pub distribution: [u32; 5],
    /// Items by name
    pub items: Vec<ItemRating>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRating {
    pub menu_item: String,
    pub count: usize,
    pub average: f64,
}

impl FeedbackManager {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    pub async fn submit_feedback(
        &self,
        actor: &UserData,
        draft: FeedbackDraft,
    ) -> WorkflowResult<MessFeedbackData> {
        require_student(actor)?;

        let rating = Rating::try_from(draft.rating)?;
        check_optional_text("menu item", draft.menu_item.as_deref(), MENU_ITEM_LENGTH)?;

        if draft
            .comments
            .as_ref()
            .is_some_and(|c| c.chars().count() > COMMENTS_LENGTH)
        {
            return Err(WorkflowError::Validation(format!(
                "comments must be at most {COMMENTS_LENGTH} characters"
            )));
        }

        let feedback = self
            .context
            .database
            .create_feedback(NewFeedback {
                student_id: actor.id,
                menu_item: draft.menu_item.map(|item| item.trim().to_string()),
                rating,
                comments: draft.comments,
            })
            .await?;

        info!(
            "Student {} rated the mess {}/{}",
            actor.username,
            feedback.rating.value(),
            Rating::MAX
        );
        Ok(feedback)
    }

    /// Feedback is listed for staff only
    pub async fn list_feedback(&self, actor: &UserData) -> WorkflowResult<Vec<MessFeedbackData>> {
        require_staff(actor)?;
        Ok(self.context.database.list_feedback().await?)
    }

    pub async fn summary(&self) -> WorkflowResult<FeedbackSummary> {
        let feedback = self.context.database.list_feedback().await?;
        Ok(summarize(&feedback))
    }
}

fn summarize(feedback: &[MessFeedbackData]) -> FeedbackSummary {
    let mut distribution = [0u32; 5];
    let mut total = 0i64;
    let mut items: BTreeMap<&str, (usize, i64)> = BTreeMap::new();

    for entry in feedback {
        let rating = entry.rating.value();

        distribution[(rating - Rating::MIN) as usize] += 1;
        total += rating as i64;

        if let Some(item) = entry.menu_item.as_deref() {
            let (count, sum) = items.entry(item).or_default();
            *count += 1;
            *sum += rating as i64;
        }
    }

    let average = (!feedback.is_empty()).then(|| total as f64 / feedback.len() as f64);

    let items = items
        .into_iter()
        .map(|(menu_item, (count, sum))| ItemRating {
            menu_item: menu_item.to_string(),
            count,
            average: sum as f64 / count as f64,
        })
        .collect();

    FeedbackSummary {
        count: feedback.len(),
        average,
        distribution,
        items,
    }
}
