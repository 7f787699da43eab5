use ingest::{PromptTemplates, TrainRow};
use rand::Rng;
use rand::seq::SliceRandom;
use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::schema::{ChatExample, ChatMessage};

pub const SYSTEM_MESSAGE: &str = "Given a question, your task is to provide the list of answers without any other context. \
If there are multiple answers, separate them with a comma. \
If there are no answers, type \"None\".";

/// Answer text used when a training row has no objects.
pub const NO_ANSWER: &str = "None";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{|\}\}|\{([^{}]*)\}").expect("valid placeholder pattern"));

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PromptError {
    #[error("no prompt template for relation `{0}`")]
    UnknownRelation(String),
    #[error("template references unknown placeholder `{0}`")]
    UnknownPlaceholder(String),
}

/// Fill `{name}` placeholders; `{{` and `}}` are literal braces.
pub fn render_template(template: &str, values: &[(&str, &str)]) -> Result<String, PromptError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(template) {
        let m = caps.get(0).map_or(0..0, |m| m.range());
        out.push_str(&template[last..m.start]);
        out.push_str(&substitute(&caps, values)?);
        last = m.end;
    }
    out.push_str(&template[last..]);

    Ok(out)
}

fn substitute(caps: &Captures<'_>, values: &[(&str, &str)]) -> Result<String, PromptError> {
    let Some(name) = caps.get(1) else {
        // `{{` or `}}`
        return Ok(caps[0][..1].to_string());
    };
    let name = name.as_str().trim();
    values
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .ok_or_else(|| PromptError::UnknownPlaceholder(name.to_string()))
}

/// Draw up to `k` distinct items from the pool.
pub fn sample_examples<'a, T, R: Rng + ?Sized>(pool: &'a [T], k: usize, rng: &mut R) -> Vec<&'a T> {
    if k == 0 {
        return Vec::new();
    }
    pool.choose_multiple(rng, k.min(pool.len())).collect()
}

pub struct PromptBuilder {
    templates: PromptTemplates,
}

impl PromptBuilder {
    pub fn new(templates: PromptTemplates) -> Self {
        Self { templates }
    }

    pub fn template(&self, relation: &str) -> Result<&str, PromptError> {
        self.templates
            .get(relation)
            .ok_or_else(|| PromptError::UnknownRelation(relation.to_string()))
    }

    /// The relation's template instantiated for one subject.
    pub fn question(&self, subject_entity: &str, relation: &str) -> Result<String, PromptError> {
        render_template(self.template(relation)?, &[("subject_entity", subject_entity)])
    }

    pub fn fill_mask_prompt(
        &self,
        subject_entity: &str,
        relation: &str,
        mask_token: &str,
    ) -> Result<String, PromptError> {
        render_template(
            self.template(relation)?,
            &[("subject_entity", subject_entity), ("mask_token", mask_token)],
        )
    }

    /// `<question> <obj1, obj2, ...>` or `<question> None`.
    pub fn in_context_example(&self, row: &TrainRow) -> Result<String, PromptError> {
        Ok(format!(
            "{} {}",
            self.question(&row.subject_entity, &row.relation)?,
            answer_text(&row.object_entities)
        ))
    }

    pub fn chat_example(&self, row: &TrainRow) -> Result<ChatExample, PromptError> {
        Ok(ChatExample {
            relation: row.relation.clone(),
            question: ChatMessage::user(self.question(&row.subject_entity, &row.relation)?),
            answer: ChatMessage::assistant(answer_text(&row.object_entities)),
        })
    }

    /// Few-shot examples, one per line, followed by the question on its own line.
    pub fn generation_prompt(
        &self,
        subject_entity: &str,
        relation: &str,
        examples: &[&String],
    ) -> Result<String, PromptError> {
        let few_shot_examples = examples
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Ok(format!(
            "{}\n{}",
            few_shot_examples,
            self.question(subject_entity, relation)?
        ))
    }

    pub fn chat_messages(
        &self,
        subject_entity: &str,
        relation: &str,
        examples: &[&ChatExample],
    ) -> Result<Vec<ChatMessage>, PromptError> {
        let mut messages = vec![ChatMessage::system(SYSTEM_MESSAGE)];
        for example in examples {
            messages.push(example.question.clone());
            messages.push(example.answer.clone());
        }
        messages.push(ChatMessage::user(self.question(subject_entity, relation)?));
        Ok(messages)
    }
}

fn answer_text(objects: &[String]) -> String {
    if objects.is_empty() {
        NO_ANSWER.to_string()
    } else {
        objects.join(", ")
    }
}
