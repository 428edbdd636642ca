use crate::core::connection::{EventFilter, EventInfo, GetEventsRequest, SorobanConnection};
use crate::core::constants::TRANSFER_FN;
use crate::error::{LumenitosSdkError, Result};
use crate::utils;
use stellar_xdr::curr::{Limits, ReadXdr, ScMap, ScVal, WriteXdr};
use tracing::{debug, warn};

const AMOUNT_FIELD: &str = "amount";

/// Value of a token `transfer` event.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferAmount {
    Amount(i128),
    /// Shape this decoder does not know. Never read as zero.
    Unrecognized(ScVal),
}

impl TransferAmount {
    /// Accepts a bare `i128`, or a map with an `amount` field (muxed
    /// transfers). Anything else is [`TransferAmount::Unrecognized`].
    pub fn decode(value: &ScVal) -> Self {
        match value {
            ScVal::I128(parts) => Self::Amount(utils::i128_from_parts(parts)),
            ScVal::Map(Some(ScMap(entries))) => {
                let amount = entries.iter().find_map(|entry| match (&entry.key, &entry.val) {
                    (ScVal::Symbol(key), ScVal::I128(parts))
                        if key.0.as_slice() == AMOUNT_FIELD.as_bytes() =>
                    {
                        Some(utils::i128_from_parts(parts))
                    },
                    _ => None,
                });
                match amount {
                    Some(amount) => Self::Amount(amount),
                    None => Self::Unrecognized(value.clone()),
                }
            },
            other => Self::Unrecognized(other.clone()),
        }
    }

    pub fn amount(&self) -> Option<i128> {
        match self {
            Self::Amount(amount) => Some(*amount),
            Self::Unrecognized(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransferRecord {
    pub id: String,
    pub ledger: u32,
    pub tx_hash: Option<String>,
    /// Token contract that emitted the event.
    pub token: String,
    pub from: String,
    pub to: String,
    pub amount: TransferAmount,
}

impl TransferRecord {
    /// `None` for events that are not transfers.
    pub fn from_event(event: &EventInfo) -> Result<Option<Self>> {
        let topics = event
            .topic
            .iter()
            .map(|t| ScVal::from_xdr_base64(t, Limits::none()))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let (from, to) = match topics.as_slice() {
            [ScVal::Symbol(name), ScVal::Address(from), ScVal::Address(to), ..]
                if name.0.as_slice() == TRANSFER_FN.as_bytes() =>
            {
                (
                    utils::sc_address_to_string(from)?,
                    utils::sc_address_to_string(to)?,
                )
            },
            _ => return Ok(None),
        };

        let value = ScVal::from_xdr_base64(&event.value, Limits::none())?;
        let amount = TransferAmount::decode(&value);
        if let TransferAmount::Unrecognized(raw) = &amount {
            warn!(id = %event.id, value = ?raw, "unrecognized transfer amount");
        }

        Ok(Some(Self {
            id: event.id.clone(),
            ledger: event.ledger,
            tx_hash: event.tx_hash.clone(),
            token: event.contract_id.clone(),
            from,
            to,
            amount,
        }))
    }
}

/// Transfers sent or received by `address` since `start_ledger`, oldest first.
pub async fn fetch_transfers<C: SorobanConnection + ?Sized>(
    connection: &C,
    address: &str,
    start_ledger: u32,
    limit: Option<u32>,
) -> Result<Vec<TransferRecord>> {
    let transfer = ScVal::Symbol(utils::symbol(TRANSFER_FN)?).to_xdr_base64(Limits::none())?;
    let party = ScVal::Address(utils::parse_sc_address(address)?).to_xdr_base64(Limits::none())?;

    let filter = |topics: Vec<String>| EventFilter {
        event_type: "contract".to_string(),
        contract_ids: Vec::new(),
        topics: vec![topics],
    };
    let request = GetEventsRequest {
        start_ledger,
        filters: vec![
            filter(vec![transfer.clone(), party.clone(), "*".into(), "**".into()]),
            filter(vec![transfer, "*".into(), party, "**".into()]),
        ],
        limit,
    };

    let response = connection
        .get_events(&request)
        .await
        .map_err(|e| LumenitosSdkError::Connection(e.to_string()))?;

    let mut records = Vec::new();
    for event in &response.events {
        if let Some(record) = TransferRecord::from_event(event)? {
            records.push(record);
        }
    }
    records.sort_by(|a, b| a.id.cmp(&b.id));
    records.dedup_by(|a, b| a.id == b.id);
    debug!(address, count = records.len(), "fetched transfers");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_xdr::curr::ScMapEntry;

    fn map(entries: Vec<(&str, ScVal)>) -> ScVal {
        ScVal::Map(Some(ScMap(
            entries
                .into_iter()
                .map(|(k, v)| ScMapEntry {
                    key: ScVal::Symbol(utils::symbol(k).unwrap()),
                    val: v,
                })
                .collect::<Vec<_>>()
                .try_into()
                .unwrap(),
        )))
    }

    #[test]
    fn test_decodes_bare_amount() {
        assert_eq!(
            TransferAmount::decode(&utils::i128_val(1_234)),
            TransferAmount::Amount(1_234)
        );
    }

    #[test]
    fn test_decodes_muxed_amount_record() {
        let value = map(vec![
            ("amount", utils::i128_val(50)),
            ("to_muxed_id", ScVal::U64(7)),
        ]);
        assert_eq!(TransferAmount::decode(&value).amount(), Some(50));
    }

    #[test]
    fn test_unrecognized_shapes_are_not_zero() {
        let value = map(vec![("value", utils::i128_val(50))]);
        let decoded = TransferAmount::decode(&value);
        assert_eq!(decoded, TransferAmount::Unrecognized(value));
        assert_eq!(decoded.amount(), None);

        assert!(matches!(
            TransferAmount::decode(&ScVal::U32(5)),
            TransferAmount::Unrecognized(ScVal::U32(5))
        ));
    }

    #[test]
    fn test_record_from_event() {
        let from = utils::account_sc_address(&[1u8; 32]);
        let to = utils::contract_sc_address(&[2u8; 32]);
        let b64 = |v: ScVal| v.to_xdr_base64(Limits::none()).unwrap();
        let event = EventInfo {
            event_type: "contract".into(),
            ledger: 77,
            contract_id: utils::encode_contract_address(&[3u8; 32]),
            id: "0001".into(),
            tx_hash: Some("aa".into()),
            topic: vec![
                b64(ScVal::Symbol(utils::symbol("transfer").unwrap())),
                b64(ScVal::Address(from.clone())),
                b64(ScVal::Address(to.clone())),
            ],
            value: b64(utils::i128_val(900)),
        };

        let record = TransferRecord::from_event(&event).unwrap().unwrap();
        assert_eq!(record.from, utils::sc_address_to_string(&from).unwrap());
        assert_eq!(record.to, utils::sc_address_to_string(&to).unwrap());
        assert_eq!(record.amount, TransferAmount::Amount(900));

        let other = EventInfo {
            topic: vec![b64(ScVal::Symbol(utils::symbol("mint").unwrap()))],
            ..event
        };
        assert!(TransferRecord::from_event(&other).unwrap().is_none());
    }
}
