//! Prompt construction for the three roles.
//!
//! Prompts are pure functions of their inputs. Each role's system prompt
//! dictates the two-section answer layout that [`SectionStreamParser`] splits,
//! so the builder is also the source of truth for each role's [`SectionLayout`].
//!
//! [`SectionStreamParser`]: crate::debate::parser::SectionStreamParser

use crate::debate::parser::SectionLayout;
use crate::debate::roles::{Message, Role};

pub const HEADLINE_TOKEN: &str = "## 💡 One-Liner";
pub const ARGUMENT_MARKER: &str = "## 📝 Full Argument";
pub const VERDICT_MARKER: &str = "## 📝 Full Verdict";

/// Builds the message lists handed to each role's session.
pub trait PromptBuilder: Send + Sync {
    /// Opening messages for Pro or Con.
    fn opening(&self, role: Role, material: &str) -> Vec<Message>;

    /// Judge messages built from the material and both full bodies.
    fn synthesis(&self, material: &str, pro_body: &str, con_body: &str) -> Vec<Message>;

    /// Marker and headline token the role is asked to produce.
    fn layout(&self, role: Role) -> SectionLayout;
}

/// Built-in prompts for a structured adversarial review.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPrompts;

impl DefaultPrompts {
    fn system_prompt(role: Role) -> String {
        match role {
            Role::Pro => format!(
                "You are the Affirmative side of a structured debate. Read the material \
                 and build the strongest honest case FOR it: its merits, the evidence that \
                 supports it, and the conditions under which it succeeds. Concede nothing \
                 you can defend, invent nothing you cannot.\n\n{}",
                layout_instructions(ARGUMENT_MARKER, "argument")
            ),
            Role::Con => format!(
                "You are the Negative side of a structured debate. Read the material and \
                 build the strongest honest case AGAINST it: its flaws, hidden costs, \
                 unstated assumptions and failure modes. Attack the substance, not the \
                 wording.\n\n{}",
                layout_instructions(ARGUMENT_MARKER, "argument")
            ),
            Role::Judge => format!(
                "You are the Adjudicator of a structured debate. You receive the original \
                 material and the full arguments of both sides. Weigh them on evidence and \
                 reasoning, state which points survive, and deliver a balanced verdict \
                 with concrete recommendations.\n\n{}",
                layout_instructions(VERDICT_MARKER, "verdict")
            ),
        }
    }
}

fn layout_instructions(marker: &str, noun: &str) -> String {
    format!(
        "Answer in exactly this layout:\n\n\
         {HEADLINE_TOKEN}\n\
         <your {noun} in one sentence>\n\n\
         {marker}\n\
         <your complete {noun} in Markdown>"
    )
}

impl PromptBuilder for DefaultPrompts {
    fn opening(&self, role: Role, material: &str) -> Vec<Message> {
        vec![
            Message::system(Self::system_prompt(role)),
            Message::user(format!("**Material under review:**\n\n{material}")),
        ]
    }

    fn synthesis(&self, material: &str, pro_body: &str, con_body: &str) -> Vec<Message> {
        let user = format!(
            "**Input:**\n\n\
             **[Original material]**\n{material}\n\n\
             **[Affirmative argument]**\n{pro_body}\n\n\
             **[Negative argument]**\n{con_body}"
        );
        vec![
            Message::system(Self::system_prompt(Role::Judge)),
            Message::user(user),
        ]
    }

    fn layout(&self, role: Role) -> SectionLayout {
        match role {
            Role::Pro | Role::Con => SectionLayout::new(HEADLINE_TOKEN, ARGUMENT_MARKER),
            Role::Judge => SectionLayout::new(HEADLINE_TOKEN, VERDICT_MARKER),
        }
    }
}
