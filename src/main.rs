//! tokengate demo - one issuance, then a series of access attempts
//!
//! Against an in-memory ledger:
//! 1. The issuer grants the guest a stay with service "1" enabled
//! 2. The guest proves possession for the palace (any capability) and each service
//! 3. A captured proof is replayed after 20 seconds and must be refused

use std::collections::BTreeMap;

use anyhow::Context;
use chrono::{Duration, TimeZone, Utc};
use log::info;
use rand_core::OsRng;

use tokengate::config::Config;
use tokengate::{
    authenticate, issue, Decision, Identity, MemoryLedger, Proof, ServiceId, ServiceScope,
    Verifier,
};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("tokengate v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("reading configuration")?;

    let check_in = Utc
        .with_ymd_and_hms(2024, 11, 21, 14, 0, 0)
        .single()
        .context("check-in time")?;
    let check_out = Utc
        .with_ymd_and_hms(2024, 11, 24, 10, 0, 0)
        .single()
        .context("check-out time")?;
    let ledger = MemoryLedger::new(check_in - Duration::hours(2));

    let issuer = match config.issuer()? {
        Some(issuer) => issuer,
        None => Identity::generate(&mut OsRng),
    };
    let guest = Identity::generate(&mut OsRng);
    info!("Issuer: {}", issuer.address());

    let services: BTreeMap<ServiceId, bool> = [("1", true), ("2", false), ("3", false)]
        .into_iter()
        .map(|(id, on)| (ServiceId::from(id), on))
        .collect();
    let (guest_address, token) = issue(&ledger, &issuer, &guest, check_in, check_out, services)
        .context("registering guest")?;
    info!("Registered guest {guest_address} with token {}", token.token_id);

    ledger.set_time(check_in + Duration::hours(10))?;

    let scopes = [
        ServiceScope::Any,
        ServiceScope::specific("1"),
        ServiceScope::specific("2"),
        ServiceScope::specific("3"),
    ];
    for scope in scopes {
        let verifier = Verifier::with_config(scope.clone(), *issuer.address(), config.verifier);
        let proof = authenticate(&ledger, &guest, scope)?;
        let decision = verifier.decide(&ledger, &guest_address, &proof)?;
        output_decision(&verifier, &proof, &decision)?;
    }

    // Replay a captured proof once its window has passed
    let verifier =
        Verifier::with_config(ServiceScope::specific("1"), *issuer.address(), config.verifier);
    let proof = authenticate(&ledger, &guest, ServiceScope::specific("1"))?;
    ledger.advance(Duration::seconds(20))?;
    let decision = verifier.decide(&ledger, &guest_address, &proof)?;
    output_decision(&verifier, &proof, &decision)?;

    Ok(())
}

/// Output one access decision (log line plus a machine-readable JSON line)
fn output_decision(verifier: &Verifier, proof: &Proof, decision: &Decision) -> anyhow::Result<()> {
    let scope = verifier.service();
    match decision {
        Decision::Granted { token_id } => info!("Service {scope}: granted by {token_id}"),
        Decision::Denied(reason) => info!("Service {scope}: denied ({reason:?})"),
    }

    let line = serde_json::json!({
        "service": scope.to_string(),
        "granted": decision.is_granted(),
        "issuer": verifier.issuer().to_string(),
        "freshness_ms": verifier.config().freshness.max_age().num_milliseconds(),
        "proof": serde_json::to_value(proof)?,
    });
    println!("{line}");
    Ok(())
}
