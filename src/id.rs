//! Prefixed ID generation for stored entities.
//!
//! Format: `mdj_{entity}_{uuid_simple}` (32 hex chars, no hyphens). The
//! brand prefix keeps our ids apart from carrier ids (Twilio `SM…`) that
//! travel through the same payloads.

use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub enum EntityType {
    User,
    Team,
    DeliveryLog,
    ScheduledTrigger,
}

impl EntityType {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::User => "mdj_usr",
            Self::Team => "mdj_team",
            Self::DeliveryLog => "mdj_log",
            Self::ScheduledTrigger => "mdj_trg",
        }
    }

    pub fn gen_id(&self) -> String {
        format!("{}_{}", self.prefix(), Uuid::new_v4().as_simple())
    }
}
