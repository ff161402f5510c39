//! Language-model prompts for actor selection, NPC actions and narration.

use std::fmt::Write as _;

use gamemaster_core::outcome::RuleOutcome;
use gamemaster_core::play_log::HistoryExchange;
use gamemaster_core::ports::ChatRequest;

/// Actor id used when an NPC turn has nobody to pick from.
pub const GENERIC_NPC_ID: &str = "npc";

/// Actor id that switches narration to the atmospheric style.
pub const NARRATOR_ENTITY_ID: &str = "narrator";

const SELECT_ACTOR_INSTRUCTION: &str = "You are the game master of a tabletop role-playing \
session. Based on the recent history and the list of active entities, decide who acts next. \
Answer with the entity_id only.";

const NARRATOR_INSTRUCTION: &str = "You are the game master and narrator of a tabletop \
role-playing session. Describe the current situation, its mood and its sensory details vividly \
and richly. Draw the players in, either by inviting their next choice or by drawing the scene \
together.";

const OUTCOME_INSTRUCTION: &str = "You are the game master of a tabletop role-playing session. \
Using the adjudicated result of the action, narrate the outcome briefly and clearly. Focus on \
whether the action succeeded and on its immediate consequences.";

/// Whether `actor` is the narrator, ignoring case.
#[must_use]
pub fn is_narrator(actor: &str) -> bool {
    actor.eq_ignore_ascii_case(NARRATOR_ENTITY_ID)
}

/// Action text used when the model cannot produce one for `actor`.
#[must_use]
pub fn fallback_npc_action(actor: &str) -> String {
    format!("{actor} acts mysteriously.")
}

/// Asks the model to pick the next actor from `candidates`.
#[must_use]
pub fn select_actor(candidates: &[&str], history: &[HistoryExchange]) -> ChatRequest {
    let user = format!(
        "Active entities: {}\n\nRecent history:\n{}\n\nWho acts next?",
        candidates.join(", "),
        render_history(history)
    );
    ChatRequest::new(SELECT_ACTOR_INSTRUCTION, user)
}

/// Asks the model for a short first-person action by `actor`.
#[must_use]
pub fn npc_action(actor: &str, history: &[HistoryExchange]) -> ChatRequest {
    let system = format!(
        "You are playing '{actor}' in a tabletop role-playing session. Stay in character and \
act naturally."
    );
    let user = format!(
        "Recent history:\n{}\n\nDescribe what you ('{actor}') do next, briefly, in the first person.",
        render_history(history)
    );
    ChatRequest::new(system, user)
}

/// Asks the model to narrate the adjudicated action.
#[must_use]
pub fn narrate(actor: &str, input_text: &str, rule: &RuleOutcome) -> ChatRequest {
    let instruction = if is_narrator(actor) {
        NARRATOR_INSTRUCTION
    } else {
        OUTCOME_INSTRUCTION
    };
    let outcome = serde_json::to_string(rule).unwrap_or_else(|_| rule.reason.clone());
    ChatRequest::new(instruction, format!("Input: {input_text}\nResult: {outcome}"))
}

fn render_history(history: &[HistoryExchange]) -> String {
    if history.is_empty() {
        return "(no earlier turns)".to_owned();
    }
    history.iter().fold(String::new(), |mut out, exchange| {
        let _ = writeln!(
            out,
            "- Action: {}\n  Narrative: {}",
            exchange.player_input, exchange.narrative
        );
        out
    })
}
