//! Parsers for memo-carrying tribute transactions.

use std::str::FromStr;

use solana_sdk::pubkey::Pubkey;

use crate::transaction::{InstructionRecord, TransactionRecord};

/// SPL Memo program (v2).
pub const MEMO_PROGRAM_ID: &str = "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr";

/// SPL Memo program (v1).
pub const MEMO_V1_PROGRAM_ID: &str = "Memo1UhkJRfHyvLMcVucJwxXeuD728EqVDDwQDxFMNo";

/// Cheap pre-filter over log lines: a tribute transaction must have touched
/// both the memo program and the token program. Anything else is not worth
/// a full transaction fetch.
pub fn has_request_markers(logs: &[String]) -> bool {
    let token_program = spl_token::id().to_string();
    let has_memo = logs
        .iter()
        .any(|line| line.contains(MEMO_PROGRAM_ID) || line.contains(MEMO_V1_PROGRAM_ID));
    let has_transfer = logs.iter().any(|line| line.contains(&token_program));
    has_memo && has_transfer
}

/// Extracts the text of the first memo instruction, if any.
pub fn first_memo_text(record: &TransactionRecord) -> Option<String> {
    record
        .instructions
        .iter()
        .find(|ix| is_memo_instruction(ix))
        .and_then(memo_instruction_text)
}

/// Finds the first base58 run in a memo that parses as a valid address.
pub fn extract_target_mint(memo: &str) -> Option<Pubkey> {
    memo.split(|c: char| !is_base58_char(c))
        .filter(|run| (32..=44).contains(&run.len()))
        .find_map(|run| Pubkey::from_str(run).ok())
}

fn is_memo_instruction(ix: &InstructionRecord) -> bool {
    if ix.program.as_deref() == Some("spl-memo") {
        return true;
    }
    match &ix.program_id {
        Some(id) => {
            let id = id.to_string();
            id == MEMO_PROGRAM_ID || id == MEMO_V1_PROGRAM_ID
        }
        None => false,
    }
}

/// Memo text from a single instruction: the parsed payload when the node
/// decoded it, else a UTF-8 read of the raw data, else one base58 decode
/// attempt for double-encoded payloads.
fn memo_instruction_text(ix: &InstructionRecord) -> Option<String> {
    if let Some(text) = &ix.parsed_text {
        return Some(text.clone());
    }
    let data = ix.data.as_ref()?;
    if let Ok(text) = std::str::from_utf8(data) {
        return Some(text.to_string());
    }
    let decoded = bs58::decode(data).into_vec().ok()?;
    String::from_utf8(decoded).ok()
}

fn is_base58_char(c: char) -> bool {
    c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l')
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signature::Signature;

    fn record_with_instructions(instructions: Vec<InstructionRecord>) -> TransactionRecord {
        TransactionRecord {
            signature: Signature::default(),
            succeeded: true,
            error: None,
            fee_lamports: 0,
            account_keys: Vec::new(),
            pre_balances: Vec::new(),
            post_balances: Vec::new(),
            pre_token_balances: Vec::new(),
            post_token_balances: Vec::new(),
            instructions,
            log_messages: Vec::new(),
        }
    }

    #[test]
    fn markers_require_both_programs() {
        let token_program = spl_token::id().to_string();
        let memo_only = vec![format!("Program {MEMO_PROGRAM_ID} invoke [1]")];
        let both = vec![
            format!("Program {MEMO_PROGRAM_ID} invoke [1]"),
            format!("Program {token_program} invoke [1]"),
        ];

        assert!(!has_request_markers(&memo_only));
        assert!(!has_request_markers(&["unrelated".to_string()]));
        assert!(has_request_markers(&both));
    }

    #[test]
    fn memo_text_prefers_parsed_payload() {
        let record = record_with_instructions(vec![InstructionRecord {
            program: Some("spl-memo".to_string()),
            parsed_text: Some("buy this".to_string()),
            data: Some(b"ignored".to_vec()),
            ..Default::default()
        }]);

        assert_eq!(first_memo_text(&record), Some("buy this".to_string()));
    }

    #[test]
    fn memo_text_falls_back_to_raw_utf8() {
        let record = record_with_instructions(vec![
            InstructionRecord {
                program: Some("spl-token".to_string()),
                ..Default::default()
            },
            InstructionRecord {
                program_id: Pubkey::from_str(MEMO_PROGRAM_ID).ok(),
                data: Some(b"raw memo text".to_vec()),
                ..Default::default()
            },
        ]);

        assert_eq!(first_memo_text(&record), Some("raw memo text".to_string()));
    }

    #[test]
    fn memo_without_recoverable_text_is_none() {
        let record = record_with_instructions(vec![InstructionRecord {
            program: Some("spl-memo".to_string()),
            ..Default::default()
        }]);

        assert_eq!(first_memo_text(&record), None);
    }

    #[test]
    fn extracts_first_valid_address_from_memo() {
        let mint = Pubkey::new_unique();
        let memo = format!("ape into {mint} please");

        assert_eq!(extract_target_mint(&memo), Some(mint));
    }

    #[test]
    fn short_or_invalid_runs_are_skipped() {
        let mint = Pubkey::new_unique();
        let memo = format!("gm gm {mint}");

        assert_eq!(extract_target_mint(&memo), Some(mint));
        assert_eq!(extract_target_mint("nothing to see here"), None);
    }
}
