//! Call-control markup (TwiML) responses.
//!
//! Only the instructions the routing processor emits are modeled: speak a
//! message, dial a softphone client, dial a phone number, hang up.

/// A voice response document.
#[derive(Debug, Default)]
pub struct VoiceResponse {
    body: String,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Speak a message to the caller.
    pub fn say(mut self, message: &str) -> Self {
        self.body
            .push_str(&format!("<Say>{}</Say>", escape(message)));
        self
    }

    /// Dial a registered softphone client identity.
    pub fn dial_client(mut self, caller_id: Option<&str>, identity: &str) -> Self {
        self.body.push_str(&dial_open(caller_id));
        self.body
            .push_str(&format!("<Client>{}</Client></Dial>", escape(identity)));
        self
    }

    /// Dial a phone number.
    pub fn dial_number(mut self, caller_id: Option<&str>, number: &str) -> Self {
        self.body.push_str(&dial_open(caller_id));
        self.body
            .push_str(&format!("<Number>{}</Number></Dial>", escape(number)));
        self
    }

    /// Hang up.
    pub fn hangup(mut self) -> Self {
        self.body.push_str("<Hangup/>");
        self
    }

    /// Render the XML document.
    pub fn build(self) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response>{}</Response>",
            self.body
        )
    }
}

fn dial_open(caller_id: Option<&str>) -> String {
    match caller_id {
        Some(id) => format!("<Dial callerId=\"{}\">", escape(id)),
        None => "<Dial>".to_string(),
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// The generic spoken response for any failure the caller must not learn
/// details of (unconfigured number, internal error).
pub fn unavailable() -> String {
    VoiceResponse::new()
        .say("We are unable to take your call right now. Please try again later.")
        .hangup()
        .build()
}
