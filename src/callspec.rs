//! Declared remote methods of the daemon.
//!
//! Each entry names a remote method (in its canonical camelCase spelling) and
//! the kinds of its leading positional arguments. The same declaration
//! generates the [`CALLSPEC`] table used for name lookup and one async method
//! per entry on [`RpcClient`].

use std::collections::HashMap;

use serde_json::{Number, Value};

use crate::{Params, Result, RpcClient, RpcClientError, Transport};

/// Declared kind of a positional argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgKind {
    Str,
    Int,
    Float,
    Bool,
    Obj,
}

/// One remote method in the call specification.
#[derive(Debug, PartialEq, Eq)]
pub struct MethodSpec {
    pub name: &'static str,
    pub args: &'static [ArgKind],
}

impl MethodSpec {
    /// Method name as sent on the wire.
    pub fn wire_name(&self) -> String {
        self.name.to_ascii_lowercase()
    }

    /// Coerces the declared leading arguments. Extra arguments pass through.
    pub(crate) fn coerce(&self, params: Params) -> Result<Vec<Value>> {
        params
            .into_inner()
            .into_iter()
            .enumerate()
            .map(|(index, value)| match self.args.get(index) {
                Some(kind) => {
                    coerce_arg(*kind, value).map_err(|reason| RpcClientError::InvalidParam {
                        method: self.name.to_owned(),
                        index,
                        reason,
                    })
                }
                None => Ok(value),
            })
            .collect()
    }
}

fn coerce_arg(kind: ArgKind, value: Value) -> std::result::Result<Value, String> {
    match kind {
        ArgKind::Str => match value {
            Value::String(_) => Ok(value),
            Value::Null => Err("expected a string, got null".to_owned()),
            other => Ok(Value::String(other.to_string())),
        },
        ArgKind::Int | ArgKind::Float => match value {
            Value::Number(_) => Ok(value),
            Value::String(text) => parse_number(kind, text.trim()),
            other => Err(format!("expected a number, got {other}")),
        },
        ArgKind::Bool => Ok(Value::Bool(match value {
            Value::Bool(flag) => flag,
            Value::Number(number) => number.as_f64() == Some(1.0),
            Value::String(text) => text == "1" || text.eq_ignore_ascii_case("true"),
            _ => false,
        })),
        ArgKind::Obj => match value {
            Value::String(text) => serde_json::from_str(&text)
                .map_err(|err| format!("expected a JSON document: {err}")),
            other => Ok(other),
        },
    }
}

fn parse_number(kind: ArgKind, text: &str) -> std::result::Result<Value, String> {
    if kind == ArgKind::Int {
        if let Ok(integer) = text.parse::<i64>() {
            return Ok(Value::from(integer));
        }
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| format!("'{text}' is not a number"))
}

/// Lookup from method name to its declaration, keyed by the declared name and
/// its lowercase alias.
#[derive(Clone, Debug)]
pub(crate) struct MethodTable {
    methods: HashMap<String, &'static MethodSpec>,
}

impl MethodTable {
    pub(crate) fn new(specs: &'static [MethodSpec]) -> Self {
        let mut methods = HashMap::with_capacity(specs.len() * 2);
        for spec in specs {
            methods.insert(spec.name.to_owned(), spec);
            methods.insert(spec.wire_name(), spec);
        }
        Self { methods }
    }

    pub(crate) fn get(&self, name: &str) -> Option<&'static MethodSpec> {
        self.methods.get(name).copied()
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }
}

macro_rules! callspec {
    ($($name:literal => $method:ident($($kind:ident),*);)*) => {
        /// Every remote method exposed by [`RpcClient`].
        pub static CALLSPEC: &[MethodSpec] = &[
            $(MethodSpec { name: $name, args: &[$(ArgKind::$kind),*] },)*
        ];

        impl<T: Transport> RpcClient<T> {
            $(
                #[doc = concat!("Calls `", $name, "` with timeout and retry handling.")]
                pub async fn $method<P: Into<Params>>(&self, params: P) -> Result<Value> {
                    self.call($name, params).await
                }
            )*
        }
    };
}

callspec! {
    "abandonTransaction" => abandon_transaction(Str);
    "addMultiSigAddress" => add_multi_sig_address();
    "addNode" => add_node();
    "backupWallet" => backup_wallet();
    "bumpFee" => bump_fee(Str);
    "createMultiSig" => create_multi_sig();
    "createRawTransaction" => create_raw_transaction(Obj, Obj);
    "decodeRawTransaction" => decode_raw_transaction();
    "dumpPrivKey" => dump_priv_key();
    "encryptWallet" => encrypt_wallet();
    "estimateFee" => estimate_fee();
    "estimateSmartFee" => estimate_smart_fee(Int, Str);
    "estimatePriority" => estimate_priority(Int);
    "generate" => generate(Int);
    "generateToAddress" => generate_to_address(Int, Str);
    "getAccount" => get_account();
    "getAccountAddress" => get_account_address(Str);
    "getAddedNodeInfo" => get_added_node_info();
    "getAddressMempool" => get_address_mempool(Obj);
    "getAddressUtxos" => get_address_utxos(Obj);
    "getAddressBalance" => get_address_balance(Obj);
    "getAddressDeltas" => get_address_deltas(Obj);
    "getAddressTxids" => get_address_txids(Obj);
    "getAddressesByAccount" => get_addresses_by_account();
    "getBalance" => get_balance(Str, Int);
    "getBestBlockHash" => get_best_block_hash();
    "getBlockDeltas" => get_block_deltas(Str);
    "getBlock" => get_block(Str, Bool);
    "getBlockchainInfo" => get_blockchain_info();
    "getBlockCount" => get_block_count();
    "getBlockHashes" => get_block_hashes(Int, Int, Obj);
    "getBlockHash" => get_block_hash(Int);
    "getBlockHeader" => get_block_header(Str);
    "getBlockNumber" => get_block_number();
    "getBlockTemplate" => get_block_template();
    "getConnectionCount" => get_connection_count();
    "getChainTips" => get_chain_tips();
    "getDifficulty" => get_difficulty();
    "getGenerate" => get_generate();
    "getHashesPerSec" => get_hashes_per_sec();
    "getInfo" => get_info();
    "getMemoryPool" => get_memory_pool();
    "getMemPoolEntry" => get_mem_pool_entry(Str);
    "getMemPoolInfo" => get_mem_pool_info();
    "getMiningInfo" => get_mining_info();
    "getNetworkInfo" => get_network_info();
    "getNewAddress" => get_new_address();
    "getPeerInfo" => get_peer_info();
    "getRawMemPool" => get_raw_mem_pool(Bool);
    "getRawTransaction" => get_raw_transaction(Str, Int);
    "getReceivedByAccount" => get_received_by_account(Str, Int);
    "getReceivedByAddress" => get_received_by_address(Str, Int);
    "getSpentInfo" => get_spent_info(Obj);
    "getTransaction" => get_transaction();
    "getTxOut" => get_tx_out(Str, Int, Bool);
    "getTxOutSetInfo" => get_tx_out_set_info();
    "getWalletInfo" => get_wallet_info();
    "getWork" => get_work();
    "help" => help();
    "importAddress" => import_address(Str, Str, Bool);
    "importMulti" => import_multi(Obj, Obj);
    "importPrivKey" => import_priv_key(Str, Str, Bool);
    "invalidateBlock" => invalidate_block(Str);
    "keyPoolRefill" => key_pool_refill();
    "listAccounts" => list_accounts(Int);
    "listAddressGroupings" => list_address_groupings();
    "listReceivedByAccount" => list_received_by_account(Int, Bool);
    "listReceivedByAddress" => list_received_by_address(Int, Bool);
    "listSinceBlock" => list_since_block(Str, Int);
    "listTransactions" => list_transactions(Str, Int, Int);
    "listUnspent" => list_unspent(Int, Int);
    "listLockUnspent" => list_lock_unspent(Bool);
    "lockUnspent" => lock_unspent();
    "move" => move_balance(Str, Str, Float, Int, Str);
    "prioritiseTransaction" => prioritise_transaction(Str, Float, Int);
    "sendFrom" => send_from(Str, Str, Float, Int, Str, Str);
    "sendMany" => send_many(Str, Obj, Int, Str);
    "sendRawTransaction" => send_raw_transaction(Str);
    "sendToAddress" => send_to_address(Str, Float, Str, Str);
    "setAccount" => set_account();
    "setGenerate" => set_generate(Bool, Int);
    "setTxFee" => set_tx_fee(Float);
    "signMessage" => sign_message();
    "signRawTransaction" => sign_raw_transaction();
    "stop" => stop();
    "submitBlock" => submit_block();
    "validateAddress" => validate_address();
    "verifyMessage" => verify_message();
    "walletLock" => wallet_lock();
    "walletPassPhrase" => wallet_pass_phrase(Str, Int);
    "walletPassphraseChange" => wallet_passphrase_change();
}
