use crate::db::CF_ACCOUNTS;
use crate::{Database, DbResult};
use consensus_core::address::ACCOUNT_SIZE;
use consensus_core::errors::StoreResult;
use consensus_core::stores::AccountStore;
use consensus_core::{AccountAddress, Amount};
use std::sync::Arc;

const TAG_BALANCE: u8 = b'b';
const TAG_TX_QUANTITY: u8 = b'q';
const TAG_EXECUTED_NONCE: u8 = b'n';

fn key(account: &AccountAddress, tag: u8) -> [u8; ACCOUNT_SIZE + 1] {
    let mut key = [0u8; ACCOUNT_SIZE + 1];
    key[..ACCOUNT_SIZE].copy_from_slice(account.as_bytes());
    key[ACCOUNT_SIZE] = tag;
    key
}

/// Account balances and nonce counters in RocksDB
pub struct DbAccountStore {
    db: Arc<Database>,
}

impl DbAccountStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn read(&self, account: &AccountAddress, tag: u8) -> DbResult<u64> {
        match self.db.get(CF_ACCOUNTS, &key(account, tag))? {
            Some(data) => super::decode_u64(&data),
            None => Ok(0),
        }
    }

    fn write(&self, account: &AccountAddress, tag: u8, value: u64) -> DbResult<()> {
        self.db.put(CF_ACCOUNTS, &key(account, tag), &value.to_be_bytes())
    }
}

impl AccountStore for DbAccountStore {
    fn balance(&self, account: &AccountAddress) -> StoreResult<Amount> {
        Ok(Amount::from_units(self.read(account, TAG_BALANCE)?))
    }

    fn set_balance(&self, account: &AccountAddress, amount: Amount) -> StoreResult<()> {
        Ok(self.write(account, TAG_BALANCE, amount.units())?)
    }

    fn tx_quantity(&self, account: &AccountAddress) -> StoreResult<u64> {
        Ok(self.read(account, TAG_TX_QUANTITY)?)
    }

    fn set_tx_quantity(&self, account: &AccountAddress, quantity: u64) -> StoreResult<()> {
        Ok(self.write(account, TAG_TX_QUANTITY, quantity)?)
    }

    fn executed_nonce(&self, account: &AccountAddress) -> StoreResult<u64> {
        Ok(self.read(account, TAG_EXECUTED_NONCE)?)
    }

    fn set_executed_nonce(&self, account: &AccountAddress, nonce: u64) -> StoreResult<()> {
        Ok(self.write(account, TAG_EXECUTED_NONCE, nonce)?)
    }
}
