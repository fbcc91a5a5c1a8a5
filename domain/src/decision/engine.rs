//! Winner and prize computation

use super::policy::PrizePolicy;
use crate::chain::{Chain, Observation};
use crate::core::hash::{Address, Digest};
use serde::{Deserialize, Serialize};

const BET_DETAILS_DOMAIN: &[u8] = b"chainbet/bet-details/v1";

/// How the pending bet resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Nothing to settle this round
    NoBet,
    /// Holder counts are equal: no winner, no payout
    Void,
    /// The bettor picked the chain with more holders
    Won,
    /// The bettor picked the other chain
    Lost,
}

impl Verdict {
    /// Result code passed to `resolveBet`
    pub fn resolution_code(&self) -> u8 {
        match self {
            Verdict::Lost | Verdict::NoBet => 0,
            Verdict::Won => 1,
            Verdict::Void => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::NoBet => "no_bet",
            Verdict::Void => "void",
            Verdict::Won => "won",
            Verdict::Lost => "lost",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a round, derived from the agreed observation only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Chain with strictly more holders; `None` on a tie
    pub winning_chain: Option<Chain>,
    pub holder_difference: u64,
    pub verdict: Verdict,
    /// Prize in wei, zero unless the verdict is [`Verdict::Won`]
    pub prize_amount: u128,
    pub beneficiary: Option<Address>,
    pub bet_id: Option<u64>,
}

impl Decision {
    /// Whether an on-chain transaction is needed to settle this decision
    pub fn requires_settlement(&self) -> bool {
        self.bet_id.is_some()
    }

    pub fn pays_out(&self) -> bool {
        self.prize_amount > 0 && self.beneficiary.is_some()
    }

    /// Content hash of the bet details, recorded on-chain with the resolution
    pub fn details_digest(&self) -> Digest {
        let winner = self.winning_chain.map_or(0, |c| c.choice_code());
        let beneficiary = self.beneficiary.unwrap_or(Address::ZERO);
        Digest::of(&[
            BET_DETAILS_DOMAIN,
            &self.bet_id.unwrap_or_default().to_be_bytes(),
            &[winner, self.verdict.resolution_code()],
            &self.holder_difference.to_be_bytes(),
            &self.prize_amount.to_be_bytes(),
            beneficiary.as_bytes(),
        ])
    }
}

/// Compute the decision for an agreed observation.
///
/// - winner: the chain with strictly greater holder count, none on a tie
/// - no pending bet: [`Verdict::NoBet`]
/// - tie with a pending bet: [`Verdict::Void`], no payout
/// - otherwise the bettor wins iff they chose the winner; prize per [`PrizePolicy`]
pub fn decide(observation: &Observation, policy: &PrizePolicy) -> Decision {
    let arbitrum = observation.holders(Chain::Arbitrum);
    let base = observation.holders(Chain::Base);

    let winning_chain = match arbitrum.cmp(&base) {
        std::cmp::Ordering::Greater => Some(Chain::Arbitrum),
        std::cmp::Ordering::Less => Some(Chain::Base),
        std::cmp::Ordering::Equal => None,
    };
    let holder_difference = arbitrum.abs_diff(base);

    let Some(bet) = &observation.pending_bet else {
        return Decision {
            winning_chain,
            holder_difference,
            verdict: Verdict::NoBet,
            prize_amount: 0,
            beneficiary: None,
            bet_id: None,
        };
    };

    let verdict = match winning_chain {
        None => Verdict::Void,
        Some(winner) if winner == bet.choice => Verdict::Won,
        Some(_) => Verdict::Lost,
    };

    let (prize_amount, beneficiary) = match verdict {
        Verdict::Won => (
            policy.prize(bet.stake, holder_difference, observation.pool_balance),
            Some(bet.bettor),
        ),
        _ => (0, None),
    };

    Decision {
        winning_chain,
        holder_difference,
        verdict,
        prize_amount,
        beneficiary,
        bet_id: Some(bet.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{Bet, Fact};
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;

    fn epoch() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).single().unwrap()
    }

    fn bettor() -> Address {
        Address::from_bytes([0xab; 20])
    }

    fn observation(arbitrum: u64, base: u64, bet: Option<Bet>, pool: u128) -> Observation {
        Observation::new(
            Fact::new(Chain::Arbitrum, arbitrum, epoch()),
            Fact::new(Chain::Base, base, epoch()),
            bet,
            pool,
        )
    }

    fn bet_on(choice: Chain, stake: u128) -> Bet {
        Bet {
            id: 3,
            choice,
            stake,
            bettor: bettor(),
        }
    }

    #[test]
    fn test_base_wins_scenario() {
        let obs = observation(1000, 1200, Some(bet_on(Chain::Base, 10_000)), 1_000_000);
        let decision = decide(&obs, &PrizePolicy::default());

        assert_eq!(decision.winning_chain, Some(Chain::Base));
        assert_eq!(decision.holder_difference, 200);
        assert_eq!(decision.verdict, Verdict::Won);
        assert_eq!(decision.prize_amount, 2_000);
        assert_eq!(decision.beneficiary, Some(bettor()));
        assert_eq!(decision.bet_id, Some(3));
        assert!(decision.pays_out());
    }

    #[test]
    fn test_tie_is_void_without_payout() {
        let obs = observation(100, 100, Some(bet_on(Chain::Arbitrum, 10_000)), 1_000_000);
        let decision = decide(&obs, &PrizePolicy::default());

        assert_eq!(decision.winning_chain, None);
        assert_eq!(decision.verdict, Verdict::Void);
        assert_eq!(decision.prize_amount, 0);
        assert_eq!(decision.beneficiary, None);
        assert!(decision.requires_settlement());
        assert!(!decision.pays_out());
    }

    #[test]
    fn test_tie_without_bet_has_nothing_to_settle() {
        let decision = decide(&observation(100, 100, None, 0), &PrizePolicy::default());
        assert_eq!(decision.verdict, Verdict::NoBet);
        assert!(!decision.requires_settlement());
    }

    #[test]
    fn test_losing_bet_resolves_without_prize() {
        let obs = observation(1500, 1200, Some(bet_on(Chain::Base, 10_000)), 1_000_000);
        let decision = decide(&obs, &PrizePolicy::default());

        assert_eq!(decision.winning_chain, Some(Chain::Arbitrum));
        assert_eq!(decision.verdict, Verdict::Lost);
        assert_eq!(decision.prize_amount, 0);
        assert_eq!(decision.verdict.resolution_code(), 0);
    }

    #[test]
    fn test_details_digest_covers_outcome() {
        let obs = observation(1000, 1200, Some(bet_on(Chain::Base, 10_000)), 1_000_000);
        let won = decide(&obs, &PrizePolicy::default());
        assert_eq!(won.details_digest(), won.clone().details_digest());

        let lost = decide(
            &observation(1000, 1200, Some(bet_on(Chain::Arbitrum, 10_000)), 1_000_000),
            &PrizePolicy::default(),
        );
        assert_ne!(won.details_digest(), lost.details_digest());

        let mut other_bet = won.clone();
        other_bet.bet_id = Some(4);
        assert_ne!(won.details_digest(), other_bet.details_digest());
    }

    #[test]
    fn test_prize_capped_at_pool() {
        let obs = observation(0, 1_000_000, Some(bet_on(Chain::Base, 10_000)), 777);
        let decision = decide(&obs, &PrizePolicy::default());
        assert_eq!(decision.prize_amount, 777);
    }

    fn arb_bet() -> impl Strategy<Value = Option<Bet>> {
        proptest::option::of(
            (any::<u64>(), any::<bool>(), 0u128..1_000_000_000_000u128).prop_map(
                |(id, on_base, stake)| Bet {
                    id,
                    choice: if on_base { Chain::Base } else { Chain::Arbitrum },
                    stake,
                    bettor: Address::from_bytes([7; 20]),
                },
            ),
        )
    }

    proptest! {
        /// Identical agreed input always yields identical output, ties included
        #[test]
        fn decide_is_deterministic(
            arbitrum in 0u64..5_000,
            base in prop_oneof![Just(None), (0u64..5_000).prop_map(Some)],
            bet in arb_bet(),
            pool in any::<u128>(),
            per_unit in 1u64..10_000,
        ) {
            let base = base.unwrap_or(arbitrum);
            let obs = observation(arbitrum, base, bet, pool);
            let policy = PrizePolicy::new(per_unit);

            let first = decide(&obs, &policy);
            let replayed = decide(&obs.clone(), &policy);
            prop_assert_eq!(&first, &replayed);
            prop_assert_eq!(
                serde_json::to_vec(&first).unwrap(),
                serde_json::to_vec(&replayed).unwrap()
            );
            if arbitrum == base {
                prop_assert_eq!(first.prize_amount, 0);
                prop_assert!(first.winning_chain.is_none());
            }
        }

        /// Widening the winner's lead never shrinks the prize, and the pool caps it
        #[test]
        fn prize_is_monotonic_and_capped(
            loser in 0u64..1_000_000,
            lead in 1u64..1_000_000,
            extra in 0u64..1_000_000,
            stake in 0u128..1_000_000_000_000u128,
            pool in 0u128..1_000_000_000u128,
        ) {
            let bet = Some(bet_on(Chain::Base, stake));
            let policy = PrizePolicy::default();

            let smaller = decide(&observation(loser, loser + lead, bet.clone(), pool), &policy);
            let larger = decide(&observation(loser, loser + lead + extra, bet, pool), &policy);

            prop_assert_eq!(smaller.verdict, Verdict::Won);
            prop_assert!(larger.prize_amount >= smaller.prize_amount);
            prop_assert!(larger.prize_amount <= pool);
        }
    }
}
