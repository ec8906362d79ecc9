//! Charge context
//!
//! Everything a CDR says about *who* is charging *whom* for *what* comes from
//! the order and the contract. It is captured once, when the manager for a
//! contract is built, and copied verbatim into every record.

use serde::{Deserialize, Serialize};

use core_kernel::{Currency, OrganizationId};

/// An organization as seen by the charging core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Organization identifier; for providers this keys the correlation counter
    pub id: OrganizationId,
    /// Display name copied into CDRs
    pub name: String,
}

impl Organization {
    pub fn new(id: OrganizationId, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

/// The offering a contract was signed for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offering {
    pub off_id: String,
    pub name: String,
    pub version: String,
    /// Provider that owns the offering and gets its revenue share
    pub owner_organization: Organization,
}

/// Pricing-model fields the charging core reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingModel {
    pub general_currency: Currency,
}

/// A purchase order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    /// Customer organization that placed the order
    pub owner_organization: Organization,
}

/// One contracted line item of an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub item_id: String,
    pub offering: Offering,
    pub revenue_class: String,
    pub pricing_model: PricingModel,
}

/// Immutable per-contract metadata stamped onto every CDR
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeContext {
    provider_id: OrganizationId,
    provider: String,
    offering: String,
    customer: String,
    product_class: String,
    currency: Currency,
    order: String,
}

impl ChargeContext {
    /// Derives the context from an order and one of its contracts
    ///
    /// The offering is rendered as `"{off_id} {name} {version}"` and the order
    /// reference as `"{order_id} {item_id}"`, the forms the settlement system
    /// uses to reconcile records against the store's catalogue.
    pub fn new(order: &Order, contract: &Contract) -> Self {
        let offering = &contract.offering;

        Self {
            provider_id: offering.owner_organization.id,
            provider: offering.owner_organization.name.clone(),
            offering: format!("{} {} {}", offering.off_id, offering.name, offering.version),
            customer: order.owner_organization.name.clone(),
            product_class: contract.revenue_class.clone(),
            currency: contract.pricing_model.general_currency,
            order: format!("{} {}", order.order_id, contract.item_id),
        }
    }

    /// Billing entity whose correlation counter numbers this context's CDRs
    pub fn provider_id(&self) -> OrganizationId {
        self.provider_id
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn offering(&self) -> &str {
        &self.offering
    }

    pub fn customer(&self) -> &str {
        &self.customer
    }

    pub fn product_class(&self) -> &str {
        &self.product_class
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn order(&self) -> &str {
        &self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Order, Contract) {
        let provider = Organization::new(OrganizationId::new(), "provider-org");
        let customer = Organization::new(OrganizationId::new(), "customer-org");

        let order = Order {
            order_id: "1".to_string(),
            owner_organization: customer,
        };
        let contract = Contract {
            item_id: "2".to_string(),
            offering: Offering {
                off_id: "61004aba5e05acc115f022f0".to_string(),
                name: "example offering".to_string(),
                version: "1.0".to_string(),
                owner_organization: provider,
            },
            revenue_class: "one time".to_string(),
            pricing_model: PricingModel {
                general_currency: Currency::EUR,
            },
        };
        (order, contract)
    }

    #[test]
    fn test_context_from_order_and_contract() {
        let (order, contract) = sample();
        let context = ChargeContext::new(&order, &contract);

        assert_eq!(context.provider(), "provider-org");
        assert_eq!(context.provider_id(), contract.offering.owner_organization.id);
        assert_eq!(context.customer(), "customer-org");
        assert_eq!(context.offering(), "61004aba5e05acc115f022f0 example offering 1.0");
        assert_eq!(context.order(), "1 2");
        assert_eq!(context.product_class(), "one time");
        assert_eq!(context.currency(), Currency::EUR);
    }

    #[test]
    fn test_contract_deserializes_currency_code() {
        let json = serde_json::json!({
            "item_id": "2",
            "offering": {
                "off_id": "off",
                "name": "name",
                "version": "1.0",
                "owner_organization": {
                    "id": "0190c6a4-3b0e-7cc0-8f0e-4c7c3e0d1a11",
                    "name": "provider"
                }
            },
            "revenue_class": "use",
            "pricing_model": { "general_currency": "eur" }
        });

        let contract: Contract = serde_json::from_value(json).unwrap();
        assert_eq!(contract.pricing_model.general_currency, Currency::EUR);
    }
}
