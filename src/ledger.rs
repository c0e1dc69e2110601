//! Append-only transaction ledger.
//!
//! Every entry documents one balance-affecting event and is created only as
//! the side effect of a successful operation. Entries are never mutated or
//! deleted except by a full [`Ledger::reset`].
//!
//! Two backends: [`MemoryLedger`] for a process-local log that never fails,
//! and [`SqliteLedger`] for the single-table relational store. Failed
//! SQLite writes are retried exactly once before surfacing a storage error.

use crate::account::AccountId;
use crate::error::{BankError, Result};
use crate::money::Money;
use chrono::{DateTime, Utc};
use log::warn;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

/// Global sequential ledger entry identifier.
pub type EntryId = u64;

/// Kind of a ledger entry. Wire names match the relational store's `tipo`
/// column values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// Funds credited to an account.
    #[serde(rename = "deposito")]
    Deposit,

    /// Funds debited from an account.
    #[serde(rename = "retirada")]
    Withdrawal,

    /// Debit side of a transfer.
    #[serde(rename = "transferencia_enviada")]
    TransferSent,

    /// Credit side of a transfer.
    #[serde(rename = "transferencia_recebida")]
    TransferReceived,
}

impl EntryKind {
    /// Stable string form, used for the `tipo` column.
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Deposit => "deposito",
            EntryKind::Withdrawal => "retirada",
            EntryKind::TransferSent => "transferencia_enviada",
            EntryKind::TransferReceived => "transferencia_recebida",
        }
    }

    /// Parses the string form. Returns `None` for an unrecognized kind.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deposito" => Some(EntryKind::Deposit),
            "retirada" => Some(EntryKind::Withdrawal),
            "transferencia_enviada" => Some(EntryKind::TransferSent),
            "transferencia_recebida" => Some(EntryKind::TransferReceived),
            _ => None,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable record of a balance-affecting event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Global sequential identifier.
    pub id: EntryId,

    /// What happened.
    #[serde(rename = "tipo")]
    pub kind: EntryKind,

    /// Positive amount moved by the event.
    #[serde(rename = "valor")]
    pub amount: Money,

    /// Account whose balance this entry documents.
    #[serde(rename = "usuario_id")]
    pub account: AccountId,

    /// Operation time.
    #[serde(rename = "data")]
    pub at: DateTime<Utc>,

    /// The other account of a transfer, absent for deposits/withdrawals.
    #[serde(rename = "contraparte", skip_serializing_if = "Option::is_none", default)]
    pub counterparty: Option<AccountId>,
}

/// Append-only record of deposits, withdrawals and transfers.
pub trait Ledger: Send + Sync {
    /// Appends one entry, assigning the next sequential identifier and the
    /// operation timestamp.
    fn record(
        &self,
        account: AccountId,
        kind: EntryKind,
        amount: Money,
        counterparty: Option<AccountId>,
    ) -> Result<LedgerEntry>;

    /// Appends the linked pair of entries for a transfer (`TransferSent` on
    /// the source, `TransferReceived` on the destination) as one unit:
    /// either both entries are recorded or neither is.
    fn record_transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Money,
    ) -> Result<(LedgerEntry, LedgerEntry)>;

    /// Returns the entries for one account, oldest first. Empty if the
    /// account has no history.
    fn list_for(&self, account: AccountId) -> Result<Vec<LedgerEntry>>;

    /// Returns all entries, oldest first.
    fn list_all(&self) -> Result<Vec<LedgerEntry>>;

    /// Deletes every entry. The only destructive operation on a ledger.
    fn reset(&self) -> Result<()>;
}

/// Runs a fallible SQLite write, retrying exactly once before surfacing the
/// failure as a storage error.
fn retry_once<T>(what: &str, mut op: impl FnMut() -> rusqlite::Result<T>) -> Result<T> {
    match op() {
        Ok(value) => Ok(value),
        Err(first) => {
            warn!("{} failed, retrying once: {}", what, first);
            op().map_err(BankError::from)
        }
    }
}

struct MemoryState {
    next_id: EntryId,
    entries: Vec<LedgerEntry>,
}

/// Process-local ledger. Recording never fails.
pub struct MemoryLedger {
    state: Mutex<MemoryState>,
}

impl MemoryLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        MemoryLedger {
            state: Mutex::new(MemoryState {
                next_id: 1,
                entries: Vec::new(),
            }),
        }
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger for MemoryLedger {
    fn record(
        &self,
        account: AccountId,
        kind: EntryKind,
        amount: Money,
        counterparty: Option<AccountId>,
    ) -> Result<LedgerEntry> {
        let mut state = self.state.lock().expect("poisoned ledger state");
        let entry = LedgerEntry {
            id: state.next_id,
            kind,
            amount,
            account,
            at: Utc::now(),
            counterparty,
        };
        state.next_id += 1;
        state.entries.push(entry.clone());
        Ok(entry)
    }

    fn record_transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Money,
    ) -> Result<(LedgerEntry, LedgerEntry)> {
        let now = Utc::now();
        let mut state = self.state.lock().expect("poisoned ledger state");

        let sent = LedgerEntry {
            id: state.next_id,
            kind: EntryKind::TransferSent,
            amount,
            account: from,
            at: now,
            counterparty: Some(to),
        };
        let received = LedgerEntry {
            id: state.next_id + 1,
            kind: EntryKind::TransferReceived,
            amount,
            account: to,
            at: now,
            counterparty: Some(from),
        };
        state.next_id += 2;
        state.entries.push(sent.clone());
        state.entries.push(received.clone());
        Ok((sent, received))
    }

    fn list_for(&self, account: AccountId) -> Result<Vec<LedgerEntry>> {
        let state = self.state.lock().expect("poisoned ledger state");
        Ok(state
            .entries
            .iter()
            .filter(|entry| entry.account == account)
            .cloned()
            .collect())
    }

    fn list_all(&self) -> Result<Vec<LedgerEntry>> {
        let state = self.state.lock().expect("poisoned ledger state");
        Ok(state.entries.clone())
    }

    fn reset(&self) -> Result<()> {
        let mut state = self.state.lock().expect("poisoned ledger state");
        state.entries.clear();
        state.next_id = 1;
        Ok(())
    }
}

const INSERT_ENTRY: &str = "INSERT INTO transacoes (tipo, valor, usuario_id, contraparte, data) \
     VALUES (?1, ?2, ?3, ?4, ?5)";

const SELECT_COLUMNS: &str = "SELECT id, tipo, valor, usuario_id, contraparte, data FROM transacoes";

/// Relational ledger over a single `transacoes` table.
///
/// Amounts are stored as text to keep the decimal representation exact.
pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    /// Opens (or creates) the ledger database at `path` and ensures the
    /// `transacoes` table exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS transacoes (
                id INTEGER PRIMARY KEY,
                tipo TEXT NOT NULL,
                valor TEXT NOT NULL,
                usuario_id INTEGER NOT NULL,
                contraparte INTEGER,
                data TEXT NOT NULL
            )",
            [],
        )?;
        Ok(SqliteLedger {
            conn: Mutex::new(conn),
        })
    }

    fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<LedgerEntry> {
        let id: i64 = row.get(0)?;
        let kind_str: String = row.get(1)?;
        let amount_str: String = row.get(2)?;
        let account: u32 = row.get(3)?;
        let counterparty: Option<u32> = row.get(4)?;
        let at_str: String = row.get(5)?;

        let kind = EntryKind::parse(&kind_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                format!("unknown entry kind {}", kind_str).into(),
            )
        })?;
        let amount = Money::from_str(&amount_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let at = DateTime::parse_from_rfc3339(&at_str)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    5,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?
            .with_timezone(&Utc);

        Ok(LedgerEntry {
            id: id as EntryId,
            kind,
            amount,
            account,
            at,
            counterparty,
        })
    }
}

impl Ledger for SqliteLedger {
    fn record(
        &self,
        account: AccountId,
        kind: EntryKind,
        amount: Money,
        counterparty: Option<AccountId>,
    ) -> Result<LedgerEntry> {
        let at = Utc::now();
        let conn = self.conn.lock().expect("poisoned ledger connection");

        let id = retry_once("ledger write", || {
            conn.execute(
                INSERT_ENTRY,
                params![
                    kind.as_str(),
                    amount.to_string(),
                    account,
                    counterparty,
                    at.to_rfc3339()
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        Ok(LedgerEntry {
            id: id as EntryId,
            kind,
            amount,
            account,
            at,
            counterparty,
        })
    }

    fn record_transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Money,
    ) -> Result<(LedgerEntry, LedgerEntry)> {
        let at = Utc::now();
        let mut conn = self.conn.lock().expect("poisoned ledger connection");

        let (sent_id, received_id) = retry_once("transfer ledger write", || {
            let tx = conn.transaction()?;
            tx.execute(
                INSERT_ENTRY,
                params![
                    EntryKind::TransferSent.as_str(),
                    amount.to_string(),
                    from,
                    Some(to),
                    at.to_rfc3339()
                ],
            )?;
            let sent_id = tx.last_insert_rowid();
            tx.execute(
                INSERT_ENTRY,
                params![
                    EntryKind::TransferReceived.as_str(),
                    amount.to_string(),
                    to,
                    Some(from),
                    at.to_rfc3339()
                ],
            )?;
            let received_id = tx.last_insert_rowid();
            tx.commit()?;
            Ok((sent_id, received_id))
        })?;

        let sent = LedgerEntry {
            id: sent_id as EntryId,
            kind: EntryKind::TransferSent,
            amount,
            account: from,
            at,
            counterparty: Some(to),
        };
        let received = LedgerEntry {
            id: received_id as EntryId,
            kind: EntryKind::TransferReceived,
            amount,
            account: to,
            at,
            counterparty: Some(from),
        };
        Ok((sent, received))
    }

    fn list_for(&self, account: AccountId) -> Result<Vec<LedgerEntry>> {
        let conn = self.conn.lock().expect("poisoned ledger connection");
        let mut stmt =
            conn.prepare(&format!("{} WHERE usuario_id = ?1 ORDER BY id", SELECT_COLUMNS))?;
        let rows = stmt.query_map(params![account], |row| Self::entry_from_row(row))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    fn list_all(&self) -> Result<Vec<LedgerEntry>> {
        let conn = self.conn.lock().expect("poisoned ledger connection");
        let mut stmt = conn.prepare(&format!("{} ORDER BY id", SELECT_COLUMNS))?;
        let rows = stmt.query_map([], |row| Self::entry_from_row(row))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    fn reset(&self) -> Result<()> {
        let conn = self.conn.lock().expect("poisoned ledger connection");
        conn.execute("DELETE FROM transacoes", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    #[test]
    fn test_memory_ids_are_sequential() {
        let ledger = MemoryLedger::new();
        let first = ledger
            .record(1, EntryKind::Deposit, money("10.00"), None)
            .unwrap();
        let second = ledger
            .record(1, EntryKind::Withdrawal, money("4.00"), None)
            .unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[test]
    fn test_memory_list_for_filters_and_keeps_order() {
        let ledger = MemoryLedger::new();
        ledger
            .record(1, EntryKind::Deposit, money("10.00"), None)
            .unwrap();
        ledger
            .record(2, EntryKind::Deposit, money("20.00"), None)
            .unwrap();
        ledger
            .record(1, EntryKind::Withdrawal, money("5.00"), None)
            .unwrap();

        let entries = ledger.list_for(1).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, EntryKind::Deposit);
        assert_eq!(entries[1].kind, EntryKind::Withdrawal);
        assert!(entries[0].id < entries[1].id);

        assert!(ledger.list_for(99).unwrap().is_empty());
    }

    #[test]
    fn test_memory_transfer_records_linked_pair() {
        let ledger = MemoryLedger::new();
        let (sent, received) = ledger.record_transfer(1, 2, money("500.00")).unwrap();

        assert_eq!(sent.kind, EntryKind::TransferSent);
        assert_eq!(sent.account, 1);
        assert_eq!(sent.counterparty, Some(2));
        assert_eq!(received.kind, EntryKind::TransferReceived);
        assert_eq!(received.account, 2);
        assert_eq!(received.counterparty, Some(1));
        assert_eq!(received.id, sent.id + 1);
    }

    #[test]
    fn test_memory_reset_clears_everything() {
        let ledger = MemoryLedger::new();
        ledger
            .record(1, EntryKind::Deposit, money("10.00"), None)
            .unwrap();
        ledger.reset().unwrap();

        assert!(ledger.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_entry_serializes_with_wire_names() {
        let ledger = MemoryLedger::new();
        let entry = ledger
            .record(1, EntryKind::Deposit, money("10.00"), None)
            .unwrap();

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["tipo"], "deposito");
        assert_eq!(json["valor"], "10.00");
        assert_eq!(json["usuario_id"], 1);
        assert!(json.get("contraparte").is_none());
    }

    #[test]
    fn test_sqlite_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");

        let ledger = SqliteLedger::open(&path).unwrap();
        let entry = ledger
            .record(1, EntryKind::Deposit, money("10.50"), None)
            .unwrap();
        assert_eq!(entry.account, 1);

        let entries = ledger.list_for(1).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::Deposit);
        assert_eq!(entries[0].amount.to_string(), "10.50");
        assert_eq!(entries[0].counterparty, None);
    }

    #[test]
    fn test_sqlite_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");

        {
            let ledger = SqliteLedger::open(&path).unwrap();
            ledger
                .record(7, EntryKind::Withdrawal, money("3.25"), None)
                .unwrap();
        }

        let reopened = SqliteLedger::open(&path).unwrap();
        let entries = reopened.list_for(7).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].amount.to_string(), "3.25");
    }

    #[test]
    fn test_sqlite_transfer_pair_and_global_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");

        let ledger = SqliteLedger::open(&path).unwrap();
        ledger
            .record(1, EntryKind::Deposit, money("100.00"), None)
            .unwrap();
        let (sent, received) = ledger.record_transfer(1, 2, money("40.00")).unwrap();

        assert_eq!(sent.counterparty, Some(2));
        assert_eq!(received.counterparty, Some(1));

        let all = ledger.list_all().unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|pair| pair[0].id < pair[1].id));

        let for_two = ledger.list_for(2).unwrap();
        assert_eq!(for_two.len(), 1);
        assert_eq!(for_two[0].kind, EntryKind::TransferReceived);
    }

    #[test]
    fn test_sqlite_reset_clears_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");

        let ledger = SqliteLedger::open(&path).unwrap();
        ledger
            .record(1, EntryKind::Deposit, money("10.00"), None)
            .unwrap();
        ledger.reset().unwrap();

        assert!(ledger.list_all().unwrap().is_empty());
    }
}
