use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::domain::conversation::NegotiationState;
use crate::domain::plan::{DebtorDetails, FinalPaymentPlan, Frequency, PaymentPlan, PlanProposal};
use crate::negotiation::link::PaymentLinkBuilder;
use crate::negotiation::math::{
    covers_debt, escalate, reconcile_term, split_installments, InstallmentSplit,
};
use crate::negotiation::policy::{MinimumPaymentPolicy, RateTablePolicy};
use crate::negotiation::response::{Assessment, ChatResponse, CounterReason, FallbackReason};

/// Heuristic knobs for how quickly the engine concedes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NegotiationSettings {
    pub counter_multiplier: Decimal,
    pub hardship_counter_multiplier: Decimal,
    pub opening_multiplier: Decimal,
    pub hardship_opening_multiplier: Decimal,
    /// Stages below this value still get escalated opening counters from `suggest_plan`.
    pub early_stage_limit: u32,
    pub fallback_term_length: u32,
    pub hardship_keywords: Vec<String>,
}

impl Default for NegotiationSettings {
    fn default() -> Self {
        Self {
            counter_multiplier: Decimal::new(125, 2),
            hardship_counter_multiplier: Decimal::new(110, 2),
            opening_multiplier: Decimal::new(15, 1),
            hardship_opening_multiplier: Decimal::new(12, 1),
            early_stage_limit: 2,
            fallback_term_length: 6,
            hardship_keywords: default_hardship_keywords(),
        }
    }
}

pub fn default_hardship_keywords() -> Vec<String> {
    ["hardship", "laid off", "medical", "difficult"].iter().map(|word| word.to_string()).collect()
}

impl NegotiationSettings {
    pub fn detects_hardship(&self, situation: &str) -> bool {
        let situation = situation.to_lowercase();
        self.hardship_keywords
            .iter()
            .map(|keyword| keyword.trim().to_lowercase())
            .any(|keyword| !keyword.is_empty() && situation.contains(&keyword))
    }
}

pub struct NegotiationEngine<P = RateTablePolicy> {
    policy: P,
    settings: NegotiationSettings,
    links: PaymentLinkBuilder,
}

impl Default for NegotiationEngine<RateTablePolicy> {
    fn default() -> Self {
        Self::new(
            RateTablePolicy::default(),
            NegotiationSettings::default(),
            PaymentLinkBuilder::new("http://localhost:3000"),
        )
    }
}

impl<P> NegotiationEngine<P>
where
    P: MinimumPaymentPolicy,
{
    pub fn new(policy: P, settings: NegotiationSettings, links: PaymentLinkBuilder) -> Self {
        Self { policy, settings, links }
    }

    pub fn settings(&self) -> &NegotiationSettings {
        &self.settings
    }

    pub fn minimum_payment(&self, frequency: Option<Frequency>, debt_amount: Decimal) -> Decimal {
        self.policy.minimum_payment(frequency, debt_amount)
    }

    /// Judges a plan the debtor put forward.
    pub fn evaluate_and_negotiate(
        &self,
        state: &mut NegotiationState,
        proposal: &PlanProposal,
        situation: &str,
    ) -> ChatResponse {
        let (frequency, term_length) = match self.screen(proposal) {
            Ok(screened) => screened,
            Err(reason) => return self.fallback(state, reason),
        };
        let debt = state.debt_amount();
        let amount = proposal.amount;
        let min_payment = self.policy.minimum_payment(Some(frequency), debt);

        if !covers_debt(amount, term_length, debt) {
            let counter_amount = if amount < min_payment {
                escalate(min_payment, self.settings.counter_multiplier)
            } else {
                amount
            };
            let message = format!(
                "{term_length} {frequency} payments of {} would not cover the full balance of {}.",
                money(amount),
                money(debt)
            );
            return self.counter_at_amount(
                state,
                message,
                frequency,
                counter_amount,
                None,
                CounterReason::DoesNotCoverDebt,
            );
        }

        if amount < min_payment {
            let hardship = self.settings.detects_hardship(situation);
            let multiplier = if hardship {
                self.settings.hardship_counter_multiplier
            } else {
                self.settings.counter_multiplier
            };
            let counter_amount = escalate(min_payment, multiplier);
            let message = if hardship {
                "I understand things are difficult right now, so this is the lowest plan I can offer."
                    .to_string()
            } else {
                format!(
                    "A {frequency} payment of {} is below what we can accept for this balance.",
                    money(amount)
                )
            };
            return self.counter_at_amount(
                state,
                message,
                frequency,
                counter_amount,
                None,
                CounterReason::BelowMinimumPayment,
            );
        }

        if proposal.scheduled_total() != Some(debt) {
            let message = format!(
                "I've adjusted the number of payments so the total matches your balance of {}.",
                money(debt)
            );
            return self.counter_at_amount(
                state,
                message,
                frequency,
                amount,
                None,
                CounterReason::TermMismatch,
            );
        }

        let stage = state.advance();
        info!(
            event_name = "negotiation.proposal_accepted",
            conversation_id = %state.conversation_id(),
            stage,
            frequency = %frequency,
            amount = %amount,
            term_length,
            "debtor proposal accepted"
        );
        ChatResponse::plans(
            format!(
                "That works: {} per {} for {term_length} payments covers your balance of {}.",
                money(amount),
                frequency.period_noun(),
                money(debt)
            ),
            PaymentPlan::new(frequency, amount, term_length, debt),
            Assessment::Accepted,
        )
    }

    /// Validates a plan the assistant wants to put forward.
    pub fn suggest_plan(
        &self,
        state: &mut NegotiationState,
        proposal: &PlanProposal,
        situation: &str,
        message: &str,
    ) -> ChatResponse {
        let (frequency, term_length) = match self.screen(proposal) {
            Ok(screened) => screened,
            Err(reason) => return self.fallback(state, reason),
        };
        let caller_message = Some(message).filter(|message| !message.trim().is_empty());
        let debt = state.debt_amount();
        let amount = proposal.amount;
        let min_payment = self.policy.minimum_payment(Some(frequency), debt);
        let early_stage = state.stage() < self.settings.early_stage_limit;

        if proposal.scheduled_total() != Some(debt) {
            let system_message = format!(
                "I've adjusted the number of payments so the total matches the balance of {}.",
                money(debt)
            );
            return self.counter_at_amount(
                state,
                system_message,
                frequency,
                amount,
                caller_message,
                CounterReason::TermMismatch,
            );
        }

        if amount < min_payment && early_stage {
            let counter_amount = escalate(min_payment, self.settings.opening_multiplier);
            let system_message =
                format!("Based on your balance of {}, here is the plan I can offer.", money(debt));
            return self.counter_at_amount(
                state,
                system_message,
                frequency,
                counter_amount,
                caller_message,
                CounterReason::EarlyStageFloor,
            );
        }

        if early_stage && self.settings.detects_hardship(situation) {
            let counter_amount =
                escalate(min_payment, self.settings.hardship_opening_multiplier);
            let system_message = "Given your situation, I can offer a reduced plan.".to_string();
            return self.counter_at_amount(
                state,
                system_message,
                frequency,
                counter_amount,
                caller_message,
                CounterReason::HardshipFloor,
            );
        }

        let stage = state.advance();
        info!(
            event_name = "negotiation.suggestion_accepted",
            conversation_id = %state.conversation_id(),
            stage,
            frequency = %frequency,
            amount = %amount,
            term_length,
            "assistant suggestion accepted unchanged"
        );
        let message = caller_message.map(str::to_string).unwrap_or_else(|| {
            format!(
                "I can offer {} per {} for {term_length} payments.",
                money(amount),
                frequency.period_noun()
            )
        });
        ChatResponse::plans(
            message,
            PaymentPlan::new(frequency, amount, term_length, debt),
            Assessment::Accepted,
        )
    }

    /// Terminal floor check. The floor is enforced here regardless of stage.
    pub fn finalize_plan(
        &self,
        state: &mut NegotiationState,
        plan: &PlanProposal,
        details: &DebtorDetails,
        message: &str,
    ) -> ChatResponse {
        let frequency = plan.parsed_frequency();
        let total_amount = plan
            .total_amount
            .filter(|total| *total > Decimal::ZERO)
            .unwrap_or_else(|| state.debt_amount());
        let min_payment = self.policy.minimum_payment(frequency, total_amount);
        let term_length = u32::try_from(plan.term_length).ok().filter(|term| *term > 0);

        let (Some(frequency), Some(term_length), true) =
            (frequency, term_length, plan.amount >= min_payment)
        else {
            return self.refuse(state, plan, frequency, total_amount, min_payment);
        };

        let agreed = PaymentPlan::new(frequency, plan.amount, term_length, total_amount);
        let payment_link = self.links.build(&agreed);
        state.reset();
        info!(
            event_name = "negotiation.plan_finalized",
            conversation_id = %state.conversation_id(),
            frequency = %frequency,
            amount = %agreed.amount,
            term_length,
            total_amount = %total_amount,
            has_debtor_name = details.name.is_some(),
            has_debtor_email = details.email.is_some(),
            "payment plan finalized"
        );

        let message = Some(message)
            .filter(|message| !message.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                format!(
                    "Your plan is confirmed: {} per {} for {term_length} payments. Use the link to set up your first payment.",
                    money(agreed.amount),
                    frequency.period_noun()
                )
            });
        ChatResponse::finalized(
            message,
            FinalPaymentPlan {
                plan: agreed,
                payment_link: Some(payment_link),
                agreed_at: Utc::now(),
            },
        )
    }

    fn refuse(
        &self,
        state: &NegotiationState,
        plan: &PlanProposal,
        frequency: Option<Frequency>,
        total_amount: Decimal,
        min_payment: Decimal,
    ) -> ChatResponse {
        let corrected_amount = plan.amount.max(min_payment);
        let term_length = reconcile_term(corrected_amount, total_amount)
            .unwrap_or(self.settings.fallback_term_length);
        let frequency = frequency.unwrap_or(Frequency::Monthly);
        warn!(
            event_name = "negotiation.finalize_refused",
            conversation_id = %state.conversation_id(),
            stage = state.stage(),
            requested_amount = %plan.amount,
            minimum_payment = %min_payment,
            "finalization refused below floor or with invalid terms"
        );

        let message = if plan.amount < min_payment {
            format!(
                "I can't confirm a {frequency} payment of {}. The minimum for a balance of {} is {} per {}, \
                 which would take {term_length} payments.",
                money(plan.amount),
                money(total_amount),
                money(min_payment),
                frequency.period_noun()
            )
        } else {
            format!(
                "I can't confirm that plan as written. Here is the closest plan I can confirm: {} per {} for {term_length} payments.",
                money(corrected_amount),
                frequency.period_noun()
            )
        };
        ChatResponse::plans(
            message,
            PaymentPlan::new(frequency, corrected_amount, term_length, total_amount),
            Assessment::Refused,
        )
    }

    fn screen(&self, proposal: &PlanProposal) -> Result<(Frequency, u32), FallbackReason> {
        let frequency = proposal.parsed_frequency().ok_or(FallbackReason::UnknownFrequency)?;
        if proposal.amount <= Decimal::ZERO {
            return Err(FallbackReason::NonPositiveAmount);
        }
        let term_length = u32::try_from(proposal.term_length)
            .ok()
            .filter(|term| *term > 0)
            .ok_or(FallbackReason::NonPositiveTerm)?;
        Ok((frequency, term_length))
    }

    fn fallback(&self, state: &mut NegotiationState, reason: FallbackReason) -> ChatResponse {
        debug!(
            event_name = "negotiation.fallback_applied",
            conversation_id = %state.conversation_id(),
            reason = ?reason,
            "proposal could not be evaluated, substituting default plan"
        );
        let term_length = self.settings.fallback_term_length.max(1);
        let debt = state.debt_amount();
        let message =
            format!("Let's start from a standard plan covering your balance of {}.", money(debt));
        self.build_counter(
            state,
            message,
            Frequency::Monthly,
            term_length,
            debt,
            None,
            Assessment::FallbackApplied(reason),
        )
    }

    fn counter_at_amount(
        &self,
        state: &mut NegotiationState,
        system_message: String,
        frequency: Frequency,
        amount: Decimal,
        caller_message: Option<&str>,
        reason: CounterReason,
    ) -> ChatResponse {
        let debt = state.debt_amount();
        let Some(term_length) = reconcile_term(amount, debt) else {
            let reason = if amount <= Decimal::ZERO {
                FallbackReason::NonPositiveAmount
            } else {
                FallbackReason::TermOutOfRange
            };
            return self.fallback(state, reason);
        };
        self.build_counter(
            state,
            system_message,
            frequency,
            term_length,
            debt,
            caller_message,
            Assessment::Countered(reason),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build_counter(
        &self,
        state: &mut NegotiationState,
        system_message: String,
        frequency: Frequency,
        term_length: u32,
        total_amount: Decimal,
        caller_message: Option<&str>,
        assessment: Assessment,
    ) -> ChatResponse {
        let term_length = term_length.max(1);
        let split = split_installments(total_amount, term_length).unwrap_or(InstallmentSplit {
            regular_amount: total_amount,
            final_amount: total_amount,
        });

        let mut plan = PaymentPlan::new(frequency, split.regular_amount, term_length, total_amount);
        let mut message = format!(
            "{system_message} Proposed plan: {} per {} for {term_length} payments.",
            money(split.regular_amount),
            frequency.period_noun()
        );
        if !split.is_even() {
            plan.final_amount = Some(split.final_amount);
            if caller_message.is_none() {
                message.push_str(&format!(
                    " The final payment will be {} instead of {}.",
                    money(split.final_amount),
                    money(split.regular_amount)
                ));
            }
        }

        let stage = state.advance();
        info!(
            event_name = "negotiation.counter_offered",
            conversation_id = %state.conversation_id(),
            stage,
            assessment = assessment.label(),
            frequency = %frequency,
            amount = %plan.amount,
            term_length,
            total_amount = %total_amount,
            "counter-offer constructed"
        );

        let message = caller_message.map(str::to_string).unwrap_or(message);
        ChatResponse::plans(message, plan, assessment)
    }
}

fn money(value: Decimal) -> String {
    format!("${}", value.round_dp(2).normalize())
}
