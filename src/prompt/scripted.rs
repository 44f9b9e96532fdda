//! Prompter that replays canned answers

use std::collections::VecDeque;
use std::sync::Mutex;

use super::{Answer, PromptError, Prompter, Question};

/// Replays scripted answers in order and records every question asked.
///
/// Text answers go through the question's validator; a rejected answer is
/// recorded and the next scripted answer is tried, like a user retyping.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Result<Answer, PromptError>>>,
    asked: Mutex<Vec<String>>,
    rejected: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn choice(self, value: &str) -> Self {
        self.push(Ok(Answer::Choice(value.to_string())))
    }

    pub fn text(self, value: &str) -> Self {
        self.push(Ok(Answer::Text(value.to_string())))
    }

    pub fn yes(self) -> Self {
        self.push(Ok(Answer::Bool(true)))
    }

    pub fn no(self) -> Self {
        self.push(Ok(Answer::Bool(false)))
    }

    pub fn interrupt(self) -> Self {
        self.push(Err(PromptError::Interrupted))
    }

    fn push(self, answer: Result<Answer, PromptError>) -> Self {
        if let Ok(mut answers) = self.answers.lock() {
            answers.push_back(answer);
        }
        self
    }

    /// Messages of the questions asked so far
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// Validator messages for rejected answers
    pub fn rejected(&self) -> Vec<String> {
        self.rejected.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.answers.lock().map(|a| a.len()).unwrap_or_default()
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&self, question: &Question) -> Result<Answer, PromptError> {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(question.message().to_string());
        }

        loop {
            let next = self
                .answers
                .lock()
                .map_err(|_| PromptError::Unexpected("script lock poisoned".into()))?
                .pop_front();
            let answer = match next {
                Some(answer) => answer?,
                None => {
                    return Err(PromptError::Unexpected(format!(
                        "no scripted answer for {:?}",
                        question.message()
                    )))
                }
            };

            if let (Answer::Text(text), Some(check)) = (&answer, question.validator()) {
                if let Err(message) = check(text) {
                    if let Ok(mut rejected) = self.rejected.lock() {
                        rejected.push(message);
                    }
                    continue;
                }
            }

            if let (Answer::Choice(choice), Question::Select { options, .. }) = (&answer, question) {
                if !options.contains(choice) {
                    return Err(PromptError::Unexpected(format!(
                        "{:?} is not one of {:?}",
                        choice, options
                    )));
                }
            }

            return Ok(answer);
        }
    }
}
