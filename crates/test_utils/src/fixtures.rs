//! Pre-built Test Fixtures
//!
//! Provides ready-to-use orders, contracts and charge contexts. Names and
//! identifiers are fixed so assertions on CDR fields stay predictable; the
//! provider id is fresh per call so concurrent tests never share a counter.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

use core_kernel::{Currency, OrganizationId};
use domain_charging::mock::RecordingDispatcher;
use domain_charging::{
    CdrManager, ChargeContext, Contract, InMemorySequenceAllocator, Offering, Order,
    Organization, PricingModel,
};

/// Fixture for the parties of a charge
pub struct OrganizationFixtures;

impl OrganizationFixtures {
    /// Provider owning the offering, with a fresh id
    pub fn provider() -> Organization {
        Organization::new(OrganizationId::new(), "Acme Provider")
    }

    /// Customer placing the order, with a fresh id
    pub fn customer() -> Organization {
        Organization::new(OrganizationId::new(), "Customer Org")
    }
}

/// Fixture for order and contract records
pub struct ContractFixtures;

impl ContractFixtures {
    pub const ORDER_ID: &'static str = "ord-1001";
    pub const ITEM_ID: &'static str = "item-1";
    pub const OFFERING_ID: &'static str = "61004aba5e05acc115f022f0";

    pub fn order() -> Order {
        Order {
            order_id: Self::ORDER_ID.to_string(),
            owner_organization: OrganizationFixtures::customer(),
        }
    }

    /// Contract priced in EUR
    pub fn contract() -> Contract {
        Self::contract_in(Currency::EUR)
    }

    pub fn contract_in(currency: Currency) -> Contract {
        Contract {
            item_id: Self::ITEM_ID.to_string(),
            offering: Offering {
                off_id: Self::OFFERING_ID.to_string(),
                name: "Cloud Storage".to_string(),
                version: "1.0".to_string(),
                owner_organization: OrganizationFixtures::provider(),
            },
            revenue_class: "subscription".to_string(),
            pricing_model: PricingModel {
                general_currency: currency,
            },
        }
    }

    pub fn charge_context() -> ChargeContext {
        ChargeContext::new(&Self::order(), &Self::contract())
    }
}

/// Fixture for timestamps
pub struct TimeFixtures;

impl TimeFixtures {
    /// Fixed charge time (Mar 15, 2024 10:30:00 UTC)
    pub fn charge_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// A manager wired to an in-memory allocator and a recording dispatcher
pub struct ChargingFixture {
    pub order: Order,
    pub contract: Contract,
    pub allocator: Arc<InMemorySequenceAllocator>,
    pub dispatcher: Arc<RecordingDispatcher>,
}

impl ChargingFixture {
    /// Creates the fixture with the provider's counter registered at zero
    pub async fn new() -> Self {
        Self::with_last_issued(0).await
    }

    /// Creates the fixture with the provider's counter at `last_issued`
    pub async fn with_last_issued(last_issued: u64) -> Self {
        let order = ContractFixtures::order();
        let contract = ContractFixtures::contract();
        let allocator = Arc::new(InMemorySequenceAllocator::new());
        allocator
            .register_at(contract.offering.owner_organization.id, last_issued)
            .await;

        Self {
            order,
            contract,
            allocator,
            dispatcher: Arc::new(RecordingDispatcher::new()),
        }
    }

    /// Billing entity numbering this fixture's CDRs
    pub fn provider_id(&self) -> OrganizationId {
        self.contract.offering.owner_organization.id
    }

    pub fn manager(&self) -> CdrManager {
        CdrManager::new(
            &self.order,
            &self.contract,
            self.allocator.clone(),
            self.dispatcher.clone(),
        )
    }
}
