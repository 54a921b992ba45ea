//! End-to-end tests of the chaintool binary, run against the certchain fixtures.

use assert_cmd::prelude::*;
use lazy_static::lazy_static;
use predicates::prelude::*;
use std::process::Command;
use std::sync::Mutex;

lazy_static! {
    static ref TEST_MUTEX: Mutex<()> = Mutex::new(());
}

const EXAMPLES: &str = "../certchain/tests/examples";

fn example(name: &str) -> String {
    format!("{}/{}", EXAMPLES, name)
}

fn chaintool() -> Result<Command, Box<dyn std::error::Error>> {
    Ok(Command::cargo_bin("chaintool")?)
}

#[test]
fn no_arguments_prints_help() -> Result<(), Box<dyn std::error::Error>> {
    let _tm = TEST_MUTEX.lock();
    chaintool()?
        .assert()
        .failure()
        .stderr(predicate::str::contains("--end-entity"));
    Ok(())
}

#[test]
fn trusted_chain() -> Result<(), Box<dyn std::error::Error>> {
    let _tm = TEST_MUTEX.lock();
    chaintool()?
        .arg("-e")
        .arg(example("chain.pem"))
        .arg("-a")
        .arg(example("root_rsa.der"))
        .arg("--cn")
        .arg("www.example.org")
        .assert()
        .success()
        .stdout(predicate::str::contains("Verification succeeded"));

    // intermediate given separately, anchor found in a folder
    chaintool()?
        .arg("--end-entity")
        .arg(example("ee_rsa.der"))
        .arg("--chain")
        .arg(example("int_rsa.der"))
        .arg("--ta-folder")
        .arg(example("ta_store"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Verification succeeded"));
    Ok(())
}

#[test]
fn failed_verification() -> Result<(), Box<dyn std::error::Error>> {
    let _tm = TEST_MUTEX.lock();
    chaintool()?
        .arg("-e")
        .arg(example("chain.pem"))
        .arg("-a")
        .arg(example("root_rsa.der"))
        .arg("--cn")
        .arg("example.com")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Verification failed"))
        .stdout(predicate::str::contains(
            "  ! The certificate Common Name (CN) does not match with the expected CN",
        ));

    chaintool()?
        .arg("-e")
        .arg(example("ee_rsa.der"))
        .arg("-a")
        .arg(example("root_rsa.der"))
        .assert()
        .code(2)
        .stdout(predicate::str::contains(
            "The certificate is not correctly signed by the trusted CA",
        ));

    chaintool()?
        .arg("-e")
        .arg(example("chain.pem"))
        .arg("-a")
        .arg(example("root_rsa.der"))
        .arg("-p")
        .arg("suiteb")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("unacceptable PK alg"));
    Ok(())
}

#[cfg(feature = "revocation")]
#[test]
fn revoked() -> Result<(), Box<dyn std::error::Error>> {
    let _tm = TEST_MUTEX.lock();
    chaintool()?
        .arg("-e")
        .arg(example("chain.pem"))
        .arg("-a")
        .arg(example("root_rsa.der"))
        .arg("--crl")
        .arg(example("crl_int.der"))
        .assert()
        .code(2)
        .stdout(predicate::str::contains(
            "The certificate has been revoked (is on a CRL)",
        ));

    chaintool()?
        .arg("-e")
        .arg(example("chain.pem"))
        .arg("-a")
        .arg(example("root_rsa.der"))
        .arg("--crl")
        .arg(example("crl_int_not_revoked.der"))
        .assert()
        .success();
    Ok(())
}

#[test]
fn time_of_interest() -> Result<(), Box<dyn std::error::Error>> {
    let _tm = TEST_MUTEX.lock();
    chaintool()?
        .arg("-e")
        .arg(example("chain.pem"))
        .arg("-a")
        .arg(example("root_rsa.der"))
        .arg("-i")
        .arg("1451606400")
        .assert()
        .code(2)
        .stdout(predicate::str::contains(
            "The certificate validity starts in the future",
        ));

    chaintool()?
        .arg("-e")
        .arg(example("chain.pem"))
        .arg("-a")
        .arg(example("root_rsa.der"))
        .arg("-s")
        .arg("tests/examples/settings_2016.json")
        .assert()
        .code(2)
        .stdout(predicate::str::contains(
            "The certificate validity starts in the future",
        ));

    // the command line wins over the settings file
    chaintool()?
        .arg("-e")
        .arg(example("chain.pem"))
        .arg("-a")
        .arg(example("root_rsa.der"))
        .arg("-s")
        .arg("tests/examples/settings_2016.json")
        .arg("-i")
        .arg("1700000000")
        .assert()
        .success();
    Ok(())
}

#[test]
fn restartable() -> Result<(), Box<dyn std::error::Error>> {
    let _tm = TEST_MUTEX.lock();
    chaintool()?
        .arg("-e")
        .arg(example("ee_ec.der"))
        .arg("-t")
        .arg(example("ta_store"))
        .arg("-m")
        .arg("100")
        .assert()
        .success()
        .stdout(predicate::str::contains("Verification was suspended 2 times"))
        .stdout(predicate::str::contains("Verification succeeded"));
    Ok(())
}

#[test]
fn errors() -> Result<(), Box<dyn std::error::Error>> {
    let _tm = TEST_MUTEX.lock();
    chaintool()?
        .arg("-e")
        .arg(example("nonexistent.der"))
        .arg("-a")
        .arg(example("root_rsa.der"))
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Error: StdError: NotFound"));

    chaintool()?
        .arg("-e")
        .arg(example("ee_dup_ext.der"))
        .arg("-a")
        .arg(example("root_rsa.der"))
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "Error: ParseError: Extensions (DuplicateExtension)",
        ));

    chaintool()?
        .arg("-e")
        .arg(example("chain.pem"))
        .arg("-a")
        .arg(example("root_rsa.der"))
        .arg("-p")
        .arg("strict")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Error: BadInputData"));

    chaintool()?
        .arg("-e")
        .arg(example("chain.pem"))
        .arg("-a")
        .arg(example("root_rsa.der"))
        .arg("-s")
        .arg("tests/examples/settings_bad.json")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Error: SettingsError"));
    Ok(())
}
