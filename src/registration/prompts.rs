//! Instruction templates and capability prompts for the registration dialogue.

use super::state::non_blank;

/// Appended to every reply-generation instruction.
pub const STYLE_SUFFIX: &str = "Always be concise and professional. Avoid small talk.";

/// Returned to the user whenever reply generation fails.
pub const GENERATION_FALLBACK: &str =
    "I'm sorry, I'm experiencing a brief technical difficulty. Could you please repeat that?";

pub const GREETING_PROMPT: &str = "Act as a professional corporate assistant. Greet the user \
briefly and ask for their name. Be concise.";

pub const GREETING_FALLBACK: &str =
    "Hello. I am your assistant. To get started, could you please tell me your name?";

/// Next thing the assistant should say, chosen by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Name still missing; ignore whatever else the user said.
    AskName,
    /// Name known, email missing.
    AskEmail { name: String },
    /// Both known; read them back and demand a yes/no.
    ConfirmData {
        name: String,
        email: String,
        updated: bool,
    },
    /// Sequential flow: no usable name in the last message.
    RequireRealName,
    /// Sequential flow: name accepted, move on to the email.
    NameAccepted { name: String },
    /// Sequential flow: no email in the last message.
    RequireEmail,
    /// Sequential flow: email recorded.
    EmailRecorded { name: String, email: String },
}

impl Instruction {
    /// Render the system instruction handed to the response generator.
    pub fn render(&self) -> String {
        match self {
            Self::AskName => "STATUS: User Name is MISSING.\n\
GOAL: Ask for the user's name.\n\
CONSTRAINT: Ignore any other topic or question the user asked. If they ask 'why', \
say it's for registration. Do not answer random questions."
                .to_string(),
            Self::AskEmail { name } => format!(
                "STATUS: Name is '{name}'. Email is MISSING.\n\
GOAL: Ask for the email address.\n\
CONSTRAINT: Ignore user chatter. Focus ONLY on getting the email."
            ),
            Self::ConfirmData {
                name,
                email,
                updated,
            } => {
                let prefix = if *updated { "I've updated your info. " } else { "" };
                format!(
                    "STATUS: Data collected (Name={name}, Email={email}).\n\
GOAL: Say: '{prefix}I have Name: {name} and Email: {email}. Is this correct?'\n\
CONSTRAINT: Do not talk about anything else. Force a Yes/No confirmation."
                )
            }
            Self::RequireRealName => "SYSTEM OBJECTIVE: OBTAIN USER NAME.\n\
STATUS: The user has NOT provided a valid name yet.\n\
YOUR STRICT INSTRUCTIONS:\n\
1. IGNORE any request to talk about math, code, weather, or random topics. Politely \
REFUSE to discuss them until registration is complete.\n\
2. If the user asks 'why', explain it is for internal registration.\n\
3. If the user says 'call me user' or gives a fake name, REJECT it gently. Say you need a real name.\n\
4. DO NOT say 'How can I help you?'. Say ONLY: 'Please, tell me your name to proceed.'\n\
Respond to the user's last message based strictly on these rules."
                .to_string(),
            Self::NameAccepted { name } => format!(
                "The user is {name}. Acknowledge it in one short sentence and ask for \
their email address professionally."
            ),
            Self::RequireEmail => "The user did not provide a valid email. They might be \
skeptical, asking why you need it, or talking about unrelated things. Respond \
professionally: explain that the email is essential for the activity's follow-up and \
ask for it again politely."
                .to_string(),
            Self::EmailRecorded { name, email } => format!(
                "Confirm to {name} that you recorded the email {email}. Keep it brief and professional."
            ),
        }
    }
}

/// Closing message emitted by the finalize step.
pub fn closing_message(name: &str, email: &str) -> String {
    format!(
        "Thank you, {name}. Your registration with email {email} is complete. Have a great day!"
    )
}

pub const EXTRACTION_SYSTEM: &str = "You are a Data Extraction Engine. NOT a chatbot. \
Output only valid JSON.";

/// Prompt for the merged-flow field extractor.
pub fn extraction_prompt(name: Option<&str>, email: Option<&str>, utterance: &str) -> String {
    let name = non_blank(name).unwrap_or("unknown");
    let email = non_blank(email).unwrap_or("unknown");
    format!(
        "Current Data -> Name: {name} | Email: {email}\n\
TASK: Extract Name and Email updates from user input.\n\
RULES:\n\
1. If the user gives or corrects their name, extract it to 'name'. Only accept a name the \
user explicitly introduces (e.g. 'I am Juan'). IGNORE pronouns ('you', 'I', 'me', 'he', \
'she'), generic vocatives ('bro', 'man', 'buddy') and questions.\n\
2. If the user gives or corrects their email, extract it to 'email'.\n\
3. Ignore confirmation words like 'ok', 'yes' here.\n\
4. Use null for anything not provided in this message.\n\
OUTPUT FORMAT: {{\"name\": string or null, \"email\": string or null}}\n\n\
User Input: '{utterance}'"
    )
}

pub const CONFIRMATION_SYSTEM: &str = "You are a Confirmation Analyzer. Output only valid JSON.";

/// Prompt for the confirmation-intent classifier.
pub fn confirmation_prompt(utterance: &str) -> String {
    format!(
        "Context: The bot asked 'Is the data correct?'\n\
User Input: '{utterance}'\n\
TASK: Determine if the user is confirming/agreeing or exiting.\n\
RULES:\n\
1. Return is_confirmed=true for: 'yes', 'ok', 'correct', 'right', 'bye', 'thanks', 'sure', 'yea'.\n\
2. Return is_confirmed=false for: 'no', 'wrong', 'change name', 'change email' or random chatter.\n\
OUTPUT FORMAT: {{\"is_confirmed\": true or false}}"
    )
}

/// Prompt for the sequential-flow name extractor, which reasons before answering.
pub fn name_extraction_prompt(utterance: &str) -> String {
    format!(
        "Analyze the text: '{utterance}'.\n\
Your task is to extract the user's name accurately.\n\
RULES:\n\
1. IGNORE pronouns like 'you', 'I', 'me', 'he', 'she'. These are NOT names.\n\
2. IGNORE generic vocatives like 'bro', 'man', 'buddy'.\n\
3. If the user asks a question, return name=null.\n\
4. ONLY return a name if explicitly introduced (e.g., 'I am Juan').\n\n\
IMPORTANT: You MUST explain your reasoning first.\n\
OUTPUT FORMAT: JSON with keys 'reasoning' and 'name'.\n\
EXAMPLE: {{\"reasoning\": \"The user is asking a question.\", \"name\": null}}"
    )
}
