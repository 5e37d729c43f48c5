use wrsync_core::{Record, SyncError, SyncResult};

use crate::slot::{Slot, SlotDescriptor};
use crate::token::Token;

const SUMMARY_PREFIX: &str = "Updated WR(s) ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The page already shows exactly this record.
    AlreadyCurrent,
    /// The page shows an equal-or-faster time (baseline drifted from the page).
    NotImproved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    Patched { text: String, summary: String },
    /// Success with nothing to publish.
    Skip(SkipReason),
}

/// One token change within a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Change {
    position: usize,
    token: Token,
    old: String,
    new: String,
}

/// Substitute `proposed` into the slot described by `descriptor`.
///
/// Every proposed record must be an improvement over the token it replaces;
/// a single equal or slower pair skips the whole patch.
pub fn patch(text: &str, descriptor: &SlotDescriptor, proposed: &[Record]) -> SyncResult<PatchOutcome> {
    patch_replacing(text, descriptor, proposed, &[])
}

/// Like [`patch`], with the baseline record each proposal supersedes
/// (`previous[i]` belongs to `proposed[i]`).
///
/// A proposal with the same time as the published token but a new link is
/// applied as a link swap when the page still shows the superseded record.
pub fn patch_replacing(
    text: &str,
    descriptor: &SlotDescriptor,
    proposed: &[Record],
    previous: &[Option<Record>],
) -> SyncResult<PatchOutcome> {
    let entity_id = proposed.first().map(|r| r.entity_id.as_str()).unwrap_or_default();
    let slot = Slot::locate(text, &descriptor.field).ok_or_else(|| SyncError::TemplateSlotNotFound {
        entity_id: entity_id.to_string(),
        field: descriptor.field.clone(),
    })?;

    let value = slot.value(text);
    let mut parts: Vec<String> = match descriptor.delimiter() {
        None => vec![value.trim().to_string()],
        Some(delimiter) => value.split(delimiter).map(|p| p.trim().to_string()).collect(),
    };

    let mut changes = Vec::with_capacity(proposed.len());
    let mut taken = Vec::with_capacity(proposed.len());
    let mut skip: Option<SkipReason> = None;

    for (i, record) in proposed.iter().enumerate() {
        let position = descriptor.position(record)?;
        if taken.contains(&position) {
            return Err(SyncError::parse_ambiguity(
                format!("'{}' slot on '{entity_id}'", descriptor.field),
                format!("two records for position {}", position + 1),
            ));
        }
        taken.push(position);
        let current = match parts.get(position).map(String::as_str) {
            None | Some("") => None,
            Some(part) => Some(Token::parse(part).ok_or_else(|| {
                SyncError::parse_ambiguity(
                    format!("'{}' slot on '{entity_id}'", descriptor.field),
                    format!("unrecognized token '{part}'"),
                )
            })?),
        };

        let superseded = previous.get(i).and_then(Option::as_ref);
        match substitute(current.as_ref(), record, superseded) {
            Ok(change) => changes.push(Change { position, ..change }),
            Err(reason) => {
                log::debug!("{}: {reason:?} against published token", record.key());
                // NotImproved dominates AlreadyCurrent.
                skip = Some(match (skip, reason) {
                    (Some(SkipReason::NotImproved), _) => SkipReason::NotImproved,
                    (_, reason) => reason,
                });
            }
        }
    }

    if let Some(reason) = skip {
        return Ok(PatchOutcome::Skip(reason));
    }
    if changes.is_empty() {
        return Ok(PatchOutcome::Skip(SkipReason::AlreadyCurrent));
    }

    let mut pieces = Vec::with_capacity(changes.len());
    for change in changes {
        if parts.len() <= change.position {
            parts.resize(change.position + 1, String::new());
        }
        parts[change.position] = change.token.to_string();
        pieces.push(format!("'{}' to '{}'", change.old, change.new));
    }

    let new_value = match descriptor.delimiter() {
        None => parts.concat(),
        Some(delimiter) => parts.join(delimiter),
    };

    let mut new_text = String::with_capacity(text.len() + new_value.len());
    new_text.push_str(&text[..slot.value.start]);
    new_text.push_str(&new_value);
    new_text.push_str(&text[slot.value.end..]);

    let summary = format!("{SUMMARY_PREFIX}{}", pieces.join(", "));
    Ok(PatchOutcome::Patched { text: new_text, summary })
}

/// Leaf rule for one (published, proposed) pair.
fn substitute(
    current: Option<&Token>,
    proposed: &Record,
    superseded: Option<&Record>,
) -> Result<Change, SkipReason> {
    let new_token = Token::from_record(proposed);
    let Some(current) = current else {
        return Ok(Change {
            position: 0,
            old: "none".into(),
            new: proposed.time.display().to_string(),
            token: new_token,
        });
    };

    if current.best_available {
        if proposed.time.cmp_value(&current.time).is_le() {
            return Ok(replace(current, new_token));
        }
        if current.link == proposed.link {
            return Err(SkipReason::AlreadyCurrent);
        }
        let token = current.with_link(&proposed.link);
        return Ok(Change {
            position: 0,
            old: current.time.display().to_string(),
            new: format!("{} [{}]", current.time.display(), proposed.link),
            token,
        });
    }

    if proposed.time == current.time {
        if proposed.link == current.link {
            return Err(SkipReason::AlreadyCurrent);
        }
        // Page still shows the superseded record: only the link moves.
        if superseded.is_some_and(|s| s.time == current.time && s.link == current.link) {
            return Ok(Change {
                position: 0,
                old: format!("{} [{}]", current.time.display(), current.link),
                new: format!("{} [{}]", current.time.display(), proposed.link),
                token: current.with_link(&proposed.link),
            });
        }
        return Err(SkipReason::NotImproved);
    }
    if !proposed.time.is_faster_than(&current.time) {
        return Err(SkipReason::NotImproved);
    }
    Ok(replace(current, new_token))
}

fn replace(current: &Token, token: Token) -> Change {
    Change {
        position: 0,
        old: current.time.display().to_string(),
        new: token.time.display().to_string(),
        token,
    }
}
