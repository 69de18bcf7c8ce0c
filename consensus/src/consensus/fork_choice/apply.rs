//! Main-block promotion, transaction application and rollback

use super::ForkChoice;
use consensus_core::errors::{ConsensusError, ConsensusResult};
use consensus_core::{Amount, Block, BlockFlags, Hash, Target};
use std::collections::HashSet;
use tracing::{debug, info, warn};

impl ForkChoice {
    /// Makes `hash` the next main block and applies everything it reaches
    pub(super) fn set_main(&mut self, hash: Hash) -> ConsensusResult<()> {
        let height = self.stats.nmain + 1;
        let reward = self.rewards.reward(height);

        let mut info = self.info(&hash)?;
        info.flags.insert(BlockFlags::MAIN);
        info.height = Some(height);
        info.amount = info
            .amount
            .checked_add(reward)
            .ok_or_else(|| ConsensusError::Inconsistent(format!("reward overflows amount of {}", hash)))?;
        self.put_info(&info)?;
        self.storage.blocks().set_height(height, &hash)?;
        self.stats.nmain = height;

        let fees = self.apply_block(hash)?;
        info!("main block {} at height {}, reward {}, fees {}", hash, height, reward, fees);
        Ok(())
    }

    /// Applies every block reachable from `main` that no earlier main block
    /// applied, links before linkers. Returns the fees collected.
    fn apply_block(&mut self, main: Hash) -> ConsensusResult<Amount> {
        let mut collected = Amount::ZERO;
        let mut seen = HashSet::new();
        let mut stack = vec![(main, false)];

        while let Some((hash, expanded)) = stack.pop() {
            if expanded {
                collected = collected.saturating_add(self.apply_one(hash, main)?);
                continue;
            }
            if !seen.insert(hash) || self.info(&hash)?.is_main_ref() {
                continue;
            }
            stack.push((hash, true));
            let block = self.block(&hash)?;
            let links: Vec<Hash> = block.block_links().collect();
            for link in links.into_iter().rev() {
                if !seen.contains(&link) {
                    stack.push((link, false));
                }
            }
        }

        let mut info = self.info(&main)?;
        info.fee = info.fee.saturating_add(collected);
        info.amount = info.amount.saturating_add(collected);
        self.put_info(&info)?;
        Ok(collected)
    }

    fn apply_one(&mut self, hash: Hash, main: Hash) -> ConsensusResult<Amount> {
        let mut info = self.info(&hash)?;
        info.flags.insert(BlockFlags::MAIN_REF);
        if hash != main {
            info.flags.insert(BlockFlags::REF);
        }
        info.reference = Some(main);
        self.put_info(&info)?;

        let block = self.block(&hash)?;
        let fee = if block.has_inputs() {
            match self.execute(&hash, &block)? {
                Some(fee) => fee,
                None => {
                    debug!("block {} not applied: inputs no longer cover it", hash);
                    return Ok(Amount::ZERO);
                }
            }
        } else {
            Amount::ZERO
        };

        let mut info = self.info(&hash)?;
        info.flags.insert(BlockFlags::APPLIED);
        self.put_info(&info)?;
        Ok(fee)
    }

    fn available(&self, target: &Target) -> ConsensusResult<Amount> {
        Ok(match target {
            Target::Account(account) => self.storage.accounts().balance(account)?,
            Target::Block(hash) => self.info(hash)?.amount,
        })
    }

    fn credit(&self, target: &Target, amount: Amount) -> ConsensusResult<()> {
        let current = self.available(target)?;
        let updated = current
            .checked_add(amount)
            .ok_or_else(|| ConsensusError::Inconsistent(format!("credit overflows {:?}", target)))?;
        self.store_amount(target, updated)
    }

    /// Saturates at zero; underflow only happens on rollback of corrupted state
    fn debit(&self, target: &Target, amount: Amount) -> ConsensusResult<()> {
        let current = self.available(target)?;
        if current < amount {
            warn!("debit of {} from {:?} exceeds balance {}", amount, target, current);
        }
        self.store_amount(target, current.saturating_sub(amount))
    }

    fn store_amount(&self, target: &Target, amount: Amount) -> ConsensusResult<()> {
        match target {
            Target::Account(account) => self.storage.accounts().set_balance(account, amount)?,
            Target::Block(hash) => {
                let mut info = self.info(hash)?;
                info.amount = amount;
                self.put_info(&info)?;
            }
        }
        Ok(())
    }

    /// Input needs aggregated per source, in first-seen order
    fn input_needs(block: &Block) -> Vec<(Target, Amount)> {
        let mut needs: Vec<(Target, Amount)> = Vec::new();
        for input in block.inputs() {
            match needs.iter_mut().find(|(t, _)| *t == input.target) {
                Some((_, need)) => *need = need.saturating_add(input.amount),
                None => needs.push((input.target, input.amount)),
            }
        }
        needs
    }

    /// Moves value for a transaction block. Returns `None`, touching
    /// nothing, when some source can no longer cover its inputs.
    fn execute(&mut self, hash: &Hash, block: &Block) -> ConsensusResult<Option<Amount>> {
        let needs = Self::input_needs(block);
        for (target, need) in &needs {
            if self.available(target)? < *need {
                return Ok(None);
            }
        }

        let per_output = self.validator.effective_fee(block);
        let mut total_in = Amount::ZERO;
        for (target, need) in &needs {
            self.debit(target, *need)?;
            total_in = total_in.saturating_add(*need);
        }

        let mut total_out = Amount::ZERO;
        let mut fee = Amount::ZERO;
        for output in block.outputs().filter(|o| !o.amount.is_zero()) {
            self.credit(&output.target, output.amount.saturating_sub(per_output))?;
            total_out = total_out.saturating_add(output.amount);
            fee = fee.saturating_add(per_output);
        }

        let surplus = total_in.saturating_sub(total_out);
        if !surplus.is_zero() {
            self.credit(&Target::Block(*hash), surplus)?;
        }

        if block.tx_nonce().is_some() {
            if let Some(sender) = block.sender() {
                self.storage.accounts().add_executed_nonce(&sender)?;
            }
        }
        Ok(Some(fee))
    }

    fn unexecute(&mut self, hash: &Hash, block: &Block) -> ConsensusResult<()> {
        let per_output = self.validator.effective_fee(block);
        let needs = Self::input_needs(block);
        let total_in = needs.iter().fold(Amount::ZERO, |acc, (_, need)| acc.saturating_add(*need));

        let mut total_out = Amount::ZERO;
        for output in block.outputs().filter(|o| !o.amount.is_zero()) {
            self.debit(&output.target, output.amount.saturating_sub(per_output))?;
            total_out = total_out.saturating_add(output.amount);
        }

        let surplus = total_in.saturating_sub(total_out);
        if !surplus.is_zero() {
            self.debit(&Target::Block(*hash), surplus)?;
        }

        for (target, need) in &needs {
            self.credit(target, *need)?;
        }

        if block.tx_nonce().is_some() {
            if let Some(sender) = block.sender() {
                self.storage.accounts().subtract_executed_nonce(&sender)?;
            }
        }
        Ok(())
    }

    /// Undoes the highest main block: reverts every block it applied and
    /// removes its reward and fees. Heights are never renumbered, so any
    /// other main block is refused.
    pub fn rollback(&mut self, main: Hash) -> ConsensusResult<()> {
        let main_info = self.info(&main)?;
        if !main_info.is_main() {
            return Err(ConsensusError::NotMain(main));
        }
        let height = main_info.height.unwrap_or(self.stats.nmain);
        if height != self.stats.nmain {
            return Err(ConsensusError::NotHighestMain { hash: main, height, top: self.stats.nmain });
        }

        let mut order = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![main];
        while let Some(hash) = stack.pop() {
            if !seen.insert(hash) {
                continue;
            }
            if self.info(&hash)?.reference != Some(main) {
                continue;
            }
            order.push(hash);
            stack.extend(self.block(&hash)?.block_links());
        }

        for hash in order.iter().rev() {
            let info = self.info(hash)?;
            if info.is_applied() {
                let block = self.block(hash)?;
                if block.has_inputs() {
                    self.unexecute(hash, &block)?;
                }
            }
            let mut info = self.info(hash)?;
            info.flags.remove(BlockFlags::APPLIED | BlockFlags::MAIN_REF);
            info.reference = None;
            self.put_info(&info)?;
        }

        let mut info = self.info(&main)?;
        let reward = self.rewards.reward(height);
        let earned = reward.saturating_add(info.fee);
        if info.amount < earned {
            warn!("main block {} holds {} but earned {}", main, info.amount, earned);
        }
        info.amount = info.amount.saturating_sub(earned);
        info.fee = Amount::ZERO;
        info.flags.remove(BlockFlags::MAIN | BlockFlags::APPLIED | BlockFlags::MAIN_REF);
        info.height = None;
        info.reference = None;
        self.put_info(&info)?;

        self.storage.blocks().remove_height(height)?;
        self.stats.nmain = self.stats.nmain.saturating_sub(1);
        self.storage.blocks().save_stats(&self.stats)?;
        debug!("rolled back main block {} at height {}", main, height);
        Ok(())
    }
}
