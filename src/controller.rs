//! Per-session conversation controller.
//!
//! A small state machine that classifies each utterance as a direct id
//! lookup, a `fetch` command, a complaint-filing trigger or continuation,
//! or a general question, and drives either the complaint gateway, the
//! multi-step data-collection dialogue, or the knowledge pipeline.
//!
//! Session state is explicit and passed in by the front-end (one
//! [`ChatSession`] per connected client, never process-wide), so the
//! console client and the HTTP chat endpoint share this controller
//! unchanged and concurrent sessions cannot interfere.
//!
//! # Classification priority (Idle state)
//!
//! 1. Exactly 8 alphanumeric characters → id lookup. Checked first, so
//!    an 8-char string is always a lookup even if it happens to contain
//!    a trigger substring.
//! 2. Leading `fetch` token → lookup of the uppercased argument.
//! 3. `file` or a filing trigger phrase → start the collection dialogue.
//! 4. Anything else → forward to the knowledge pipeline.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::models::{Complaint, CreateAck, NewComplaint};
use crate::rag::RetrievalError;

static ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]{8}$").unwrap());

const TRIGGER_PHRASES: [&str; 4] = [
    "register a complaint",
    "new complaint",
    "raise a complaint",
    "log a complaint",
];

const DEGRADED_MESSAGE: &str =
    "Sorry, the knowledge assistant is unavailable right now. Please try again later.";

/// How the complaint service is reached: over HTTP from the console
/// front-end, in-process from the server's chat endpoint.
#[async_trait]
pub trait ComplaintsGateway: Send + Sync {
    async fn create(&self, new: &NewComplaint) -> Result<CreateAck, GatewayError>;
    async fn fetch(&self, id: &str) -> Result<Complaint, GatewayError>;
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },
    #[error("complaint not found")]
    NotFound,
    /// Connectivity failure; rendered as "could not reach", never a crash.
    #[error("could not reach the complaint service: {0}")]
    Unreachable(String),
    #[error("complaint service error: {0}")]
    Failed(String),
}

/// Question-answering seam, implemented by the knowledge pipeline.
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn answer(&self, question: &str) -> Result<String, RetrievalError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilingState {
    Idle,
    CollectingName,
    CollectingPhone,
    CollectingEmail,
    CollectingDetails,
}

/// Partially collected complaint fields during a filing dialogue.
#[derive(Debug, Clone, Default)]
struct Draft {
    name: Option<String>,
    phone: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

/// One display turn of the conversation.
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

/// Ephemeral per-session state. Created when a client session starts,
/// discarded when it ends; never persisted.
pub struct ChatSession {
    /// Append-only, display-only; the classifier never consults it.
    pub history: Vec<Turn>,
    state: FilingState,
    draft: Draft,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            history: Vec::new(),
            state: FilingState::Idle,
            draft: Draft::default(),
        }
    }

    pub fn state(&self) -> FilingState {
        self.state
    }

    fn reset(&mut self) {
        self.state = FilingState::Idle;
        self.draft = Draft::default();
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Controller<'a> {
    pub gateway: &'a dyn ComplaintsGateway,
    pub answerer: Option<&'a dyn Answerer>,
}

impl Controller<'_> {
    /// Process one utterance, mutating the session and returning the reply.
    pub async fn handle(&self, session: &mut ChatSession, input: &str) -> String {
        let input = input.trim();
        session.history.push(Turn {
            role: Role::User,
            text: input.to_string(),
        });

        let reply = match session.state {
            FilingState::Idle => self.classify_and_dispatch(session, input).await,
            _ => self.advance_filing(session, input).await,
        };

        session.history.push(Turn {
            role: Role::Bot,
            text: reply.clone(),
        });
        reply
    }

    async fn classify_and_dispatch(&self, session: &mut ChatSession, input: &str) -> String {
        // Rule 1: bare 8-char alphanumeric id, before any trigger check.
        if ID_RE.is_match(input) {
            return self.lookup(&input.to_uppercase()).await;
        }

        // Rule 2: "fetch <id>"
        let mut tokens = input.split_whitespace();
        if tokens
            .next()
            .is_some_and(|t| t.eq_ignore_ascii_case("fetch"))
        {
            return match tokens.next() {
                Some(arg) => self.lookup(&arg.to_uppercase()).await,
                None => {
                    "Please provide a complaint ID. Usage: fetch <complaint_id>".to_string()
                }
            };
        }

        // Rule 3: filing trigger
        let lower = input.to_lowercase();
        if lower == "file" || TRIGGER_PHRASES.iter().any(|p| lower.contains(p)) {
            session.state = FilingState::CollectingName;
            return "Let's file your complaint. Please enter your name:".to_string();
        }

        // Rule 4: general question
        match self.answerer {
            Some(answerer) => match answerer.answer(input).await {
                Ok(answer) => answer,
                Err(_) => "Sorry, I could not answer that right now.".to_string(),
            },
            None => DEGRADED_MESSAGE.to_string(),
        }
    }

    async fn advance_filing(&self, session: &mut ChatSession, input: &str) -> String {
        match session.state {
            FilingState::CollectingName => {
                session.draft.name = Some(input.to_string());
                session.state = FilingState::CollectingPhone;
                "Please enter your phone number:".to_string()
            }
            FilingState::CollectingPhone => {
                session.draft.phone = Some(input.to_string());
                session.state = FilingState::CollectingEmail;
                "Please enter your email:".to_string()
            }
            FilingState::CollectingEmail => {
                session.draft.email = Some(input.to_string());
                session.state = FilingState::CollectingDetails;
                "Please describe your complaint:".to_string()
            }
            FilingState::CollectingDetails => {
                let new = NewComplaint {
                    name: session.draft.name.clone().unwrap_or_default(),
                    phone_number: session.draft.phone.clone().unwrap_or_default(),
                    email: session.draft.email.clone().unwrap_or_default(),
                    complaint_details: input.to_string(),
                };
                // Draft and flag are cleared together, whatever the outcome.
                session.reset();

                match self.gateway.create(&new).await {
                    Ok(ack) => {
                        format!("Complaint filed! Your complaint ID is: {}", ack.complaint_id)
                    }
                    Err(GatewayError::Validation { field, message }) => {
                        format!("Could not file the complaint. Invalid {}: {}", field, message)
                    }
                    Err(GatewayError::Unreachable(_)) => {
                        "Could not reach the complaint service. Please try again later."
                            .to_string()
                    }
                    Err(e) => format!("Failed to file the complaint: {}", e),
                }
            }
            FilingState::Idle => unreachable!("advance_filing called in Idle"),
        }
    }

    async fn lookup(&self, id: &str) -> String {
        match self.gateway.fetch(id).await {
            Ok(complaint) => render_complaint(&complaint),
            Err(GatewayError::NotFound) => format!("Complaint {} not found.", id),
            Err(GatewayError::Unreachable(_)) => {
                "Could not reach the complaint service. Please try again later.".to_string()
            }
            Err(e) => format!("Failed to fetch the complaint: {}", e),
        }
    }
}

/// Multi-line display rendering of a stored complaint.
pub fn render_complaint(c: &Complaint) -> String {
    format!(
        "Complaint {}\n  name:    {}\n  phone:   {}\n  email:   {}\n  details: {}\n  created: {}",
        c.complaint_id, c.name, c.phone_number, c.email, c.complaint_details, c.created_at
    )
}
