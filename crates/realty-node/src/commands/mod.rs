pub mod deploy;
pub mod init;
pub mod show;
pub mod verify;

use std::path::Path;

use anyhow::Context;
use realty_types::LedgerConfig;

/// Read the config file, apply `REALTY_*` overrides, and validate.
pub fn load_config(path: &Path) -> anyhow::Result<LedgerConfig> {
    let mut config = LedgerConfig::from_json_file(path)
        .context("loading config (run `realty-node init` first?)")?;
    config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use realty_custody::AssetRegistry;
    use realty_types::constants::DEFAULT_CONFIG_FILE;
    use realty_types::{AssetId, EscrowError, PartyId};
    use rust_decimal::Decimal;

    use super::*;
    use crate::state;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("realty-node-{}", uuid::Uuid::now_v7()))
    }

    fn init_args(dir: &Path) -> init::InitArgs {
        init::InitArgs {
            dir: dir.to_path_buf(),
            ledger_account: "escrow-ledger".into(),
            registry_id: "property-registry".into(),
            seller: "seller".into(),
            inspector: "inspector".into(),
            lender: "lender".into(),
            force: false,
        }
    }

    fn deploy_args() -> deploy::DeployArgs {
        deploy::DeployArgs {
            buyer: "buyer".into(),
            buyer_funds: Decimal::new(100, 0),
            lender_funds: Decimal::new(100, 0),
            force: false,
        }
    }

    #[test]
    fn init_deploy_verify_flow() {
        let dir = temp_dir();
        init::run(&init_args(&dir)).unwrap();
        let config = load_config(&dir.join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(config.storage.data_dir, dir.join("data"));

        deploy::run(&config, &deploy_args()).unwrap();

        let ledger = state::load(&config.storage.snapshot_path()).unwrap();
        let prices: Vec<(Decimal, Decimal)> = ledger
            .records()
            .map(|r| (r.purchase_price, r.escrow_amount))
            .collect();
        assert_eq!(
            prices,
            vec![
                (Decimal::new(20, 0), Decimal::new(10, 0)),
                (Decimal::new(15, 0), Decimal::new(5, 0)),
                (Decimal::new(10, 0), Decimal::new(5, 0)),
            ]
        );
        for n in 1..=3 {
            assert!(ledger.is_listed(AssetId(n)));
            assert_eq!(ledger.buyer(AssetId(n)), Some(&PartyId::new("buyer")));
            assert_eq!(
                ledger.registry().custodian_of(AssetId(n)).unwrap(),
                PartyId::new("escrow-ledger")
            );
        }
        assert_eq!(ledger.journal().len(), 3);

        show::run(&config, &show::ShowArgs { asset: None, json: true }).unwrap();
        verify::run(&config, &verify::VerifyArgs { events: true }).unwrap();

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = temp_dir();
        init::run(&init_args(&dir)).unwrap();
        assert!(init::run(&init_args(&dir)).is_err());

        let mut forced = init_args(&dir);
        forced.force = true;
        assert!(init::run(&forced).is_ok());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn deploy_refuses_to_overwrite() {
        let dir = temp_dir();
        init::run(&init_args(&dir)).unwrap();
        let config = load_config(&dir.join(DEFAULT_CONFIG_FILE)).unwrap();
        deploy::run(&config, &deploy_args()).unwrap();
        assert!(deploy::run(&config, &deploy_args()).is_err());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn show_unknown_asset_fails() {
        let dir = temp_dir();
        init::run(&init_args(&dir)).unwrap();
        let config = load_config(&dir.join(DEFAULT_CONFIG_FILE)).unwrap();
        deploy::run(&config, &deploy_args()).unwrap();

        let err = show::run(&config, &show::ShowArgs { asset: Some(9), json: false }).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EscrowError>(),
            Some(EscrowError::NotFound(AssetId(9)))
        ));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn verify_detects_tampering() {
        let dir = temp_dir();
        init::run(&init_args(&dir)).unwrap();
        let config = load_config(&dir.join(DEFAULT_CONFIG_FILE)).unwrap();
        deploy::run(&config, &deploy_args()).unwrap();

        let path = config.storage.snapshot_path();
        let mut saved: state::NodeState = realty_settlement::load_json(&path).unwrap();
        saved.ledger.records[0].deposited_balance = Decimal::new(1, 0);
        realty_settlement::save_json(&path, &saved).unwrap();

        assert!(verify::run(&config, &verify::VerifyArgs { events: false }).is_err());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_config_is_reported() {
        let err = load_config(&temp_dir().join(DEFAULT_CONFIG_FILE)).unwrap_err();
        assert!(format!("{err:#}").contains("realty-node init"));
    }
}
