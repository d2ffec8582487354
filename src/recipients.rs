//! Active recipient selection.

use rusqlite::Connection;

use crate::db::queries;
use crate::error::Result;
use crate::models::Recipient;

/// Build the number handed to the SMS carrier: dial code followed by the
/// local number with a single leading zero removed.
///
/// Best effort only. The dial code is used verbatim and nothing else is
/// validated, so `"33"` + `"0612345678"` gives `"33612345678"`.
pub fn format_phone_number(dial_code: &str, local: &str) -> String {
    let local = local.strip_prefix('0').unwrap_or(local);
    format!("{}{}", dial_code, local)
}

/// Every user eligible for today's send, oldest account first.
pub fn list_active(conn: &Connection) -> Result<Vec<Recipient>> {
    let users = queries::list_active_users(conn)?;
    Ok(users
        .into_iter()
        .map(|u| Recipient {
            phone_number: format_phone_number(&u.phone_country, &u.phone_number),
            user_id: u.id,
            email: u.email,
            role: u.role,
            plan_name: u.plan_name,
            subscription_status: u.subscription_status,
        })
        .collect())
}
