//! Keep one contract per API

use std::cmp::Reverse;

use tracing::debug;

use super::ContractRef;

/// One contract per `(category, call_name)`
///
/// Within a group the sort key `(category, call, beta, -version)` puts the
/// highest stable version first. A group published only as beta keeps its
/// highest beta, since some APIs (Developer Analytics) have no stable
/// release.
pub fn dedupe(mut contracts: Vec<ContractRef>) -> Vec<ContractRef> {
    contracts.sort_by(|a, b| {
        (&a.category, &a.call_name, a.beta, Reverse(a.version), &a.url)
            .cmp(&(&b.category, &b.call_name, b.beta, Reverse(b.version), &b.url))
    });

    let mut kept: Vec<ContractRef> = Vec::with_capacity(contracts.len());
    for contract in contracts {
        match kept.last() {
            Some(last) if last.category == contract.category && last.call_name == contract.call_name => {
                debug!(dropped = %contract.filename(), kept = %last.filename(), "Superseded contract");
            }
            _ => kept.push(contract),
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(name: &str) -> ContractRef {
        ContractRef::from_url(&format!("https://developer.ebay.com/x/{}", name)).unwrap()
    }

    #[test]
    fn test_highest_stable_wins() {
        let kept = dedupe(vec![
            contract("sell_inventory_v1_oas3.json"),
            contract("sell_inventory_v2_beta_oas3.json"),
            contract("buy_browse_v1_oas3.json"),
            contract("sell_inventory_v2_oas3.json"),
            contract("sell_inventory_v3_beta_oas3.json"),
        ]);

        let names: Vec<String> = kept.iter().map(ContractRef::filename).collect();
        assert_eq!(names, vec!["buy_browse_v1_oas3.json", "sell_inventory_v2_oas3.json"]);
    }

    #[test]
    fn test_beta_only_group_is_kept() {
        let kept = dedupe(vec![
            contract("developer_analytics_v1_beta_oas3.json"),
            contract("developer_analytics_v2_beta_oas3.json"),
        ]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].version, 2);
    }

    #[test]
    fn test_order_independent() {
        let a = vec![contract("sell_account_v1_oas3.json"), contract("sell_account_v2_oas3.json")];
        let mut b = a.clone();
        b.reverse();
        assert_eq!(dedupe(a), dedupe(b));
    }
}
