/*
    End to end runs of a signer session: the account leaves the device
    as UR text, a PSBT comes back the same way, gets checked, signed
    and sent out again.
*/

use btc_urkit::{
    error::ErrorKind,
    mnemonic::{mnemonic_from_entropy, mnemonic_to_entropy},
    prelude::*,
    script::ScriptType,
    ur::{URDecoder, UREncoder},
    urtypes::RegistryItem,
};
use tracing_subscriber::EnvFilter;

const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
const MINI_WALLET: &str = "alien visual jealous source coral memory embark certain radar capable clip edit";
const MINI_PSBT: &str = "70736274ff01007202000000018dcb07ab5e107eaa24796e1581b70107bc9f41c351c51212ec365882751020d4\
    0000000000ffffffff0280c3c9010000000017a914f3cdbe9d53032868f8acace30c1e8d8f226a48108768f3210a00000000160014146d6f3f\
    b6b420e1ddcf28bf162e2da451ad41a8000000000001011f00c2eb0b00000000160014d1e82af87e53360342cc1a31a2699f9f868777ed2206\
    0211dfef7ec7d630948e42752b90ea164698d247a2871796050a66d640ed559cb118b317ec86540000800100008000000080000000000000\
    000000002202033ed4d38b6ed5170e7d8dd9960d5f1bd5872243385818eee6f3307d0af0f46eb718b317ec865400008001000080000000800100\
    00000000000000";

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

//Runs the encoder until the decoder is done, returns how many parts it took
fn transfer(encoder: &mut UREncoder, decoder: &mut URDecoder) -> usize {
    let mut sent = 0;
    while !decoder.is_complete() {
        decoder.read_part(&encoder.next_part()).unwrap();
        sent += 1;
        assert!(sent < 1000, "transfer did not converge");
    }
    sent
}

#[test]
fn receive_address_from_entropy() {
    init_logging();
    let entropy = hex::decode("64d3e4a0a387e28021df55a51d454dcf").unwrap();
    let phrase = mnemonic_from_entropy(&entropy).unwrap();
    assert_eq!(phrase, "gospel palace choice either lawsuit divorce manual turkey pink tuition fat pair");
    assert_eq!(mnemonic_to_entropy(&phrase).unwrap(), entropy);

    let store = KeyStore::from_mnemonic(&phrase, "", Network::Testnet).unwrap();
    let address = store.address(0, false).unwrap();
    assert_eq!(address, "tb1qzjgh68t6tu37am8ssk6m52rgq0nwtaehzdmsre");

    let script = Script::from_address(&address, Network::Testnet).unwrap();
    assert_eq!(script.script_type(), ScriptType::P2wpkh);
    let expected = store.account().derive("m/0/0").unwrap().public_key();
    assert_eq!(script, Script::p2wpkh(&expected));

    let again = KeyStore::from_mnemonic(&phrase, "", Network::Testnet).unwrap();
    assert_eq!(again.address(0, false).unwrap(), address);
    assert_ne!(store.address(1, false).unwrap(), address);
    //A password gives a different wallet
    let other = KeyStore::from_mnemonic(&phrase, "TREZOR", Network::Testnet).unwrap();
    assert_ne!(other.address(0, false).unwrap(), address);
}

#[test]
fn bip84_test_vector() {
    init_logging();
    let store = KeyStore::from_mnemonic(ABANDON, "", Network::Mainnet).unwrap();
    assert_eq!(store.address(0, false).unwrap(), "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu");
    let store = KeyStore::from_mnemonic(ABANDON, "", Network::Testnet).unwrap();
    assert_eq!(store.address(0, false).unwrap(), "tb1q6rz28mcfaxtmd6v789l9rrlrusdprr9pqcpvkl");
}

#[test]
fn pure_fragments_in_reverse() {
    init_logging();
    //98 bytes plus the two byte CBOR head make a 100 byte message
    let payload: Vec<u8> = (0..98).collect();
    let encoder = UREncoder::new("bytes", &payload).unwrap().with_part_len(25).unwrap();
    assert_eq!(encoder.msg_len(), 100);
    assert_eq!(encoder.seq_len(), 4);

    let mut decoder = URDecoder::new();
    for idx in [3, 2, 1] {
        decoder.read_part(&encoder.get_part(idx)).unwrap();
        assert!(!decoder.is_complete());
        assert!(decoder.result().is_err());
    }
    decoder.read_part(&encoder.get_part(0)).unwrap();
    assert!(decoder.is_complete());
    assert_eq!(decoder.result().unwrap(), payload);
}

#[test]
fn mixed_fragments_fill_the_gap() {
    init_logging();
    let payload: Vec<u8> = (0..98).collect();
    let encoder = UREncoder::new("bytes", &payload).unwrap().with_part_len(25).unwrap();
    let mut decoder = URDecoder::new();
    for idx in 0..3 {
        decoder.read_part(&encoder.get_part(idx)).unwrap();
    }
    assert!(!decoder.is_complete());

    //Parts 6 and 9 mix fragments {0,1,2} and {2}, nothing new
    assert!(!decoder.read_part(&encoder.get_part(5)).unwrap());
    assert!(!decoder.read_part(&encoder.get_part(8)).unwrap());
    assert!(!decoder.is_complete());
    assert!(decoder.progress() < 1.0);

    //Part 7 mixes {0,2,3} and leaves the last fragment
    assert!(decoder.read_part(&encoder.get_part(6)).unwrap());
    assert!(decoder.is_complete());
    assert_eq!(decoder.result().unwrap(), payload);

    //Parts 5 and 8 arrive late and change nothing
    assert!(!decoder.read_part(&encoder.get_part(4)).unwrap());
    assert!(!decoder.read_part(&encoder.get_part(7)).unwrap());
    assert_eq!(decoder.progress(), 1.0);
}

#[test]
fn account_export() {
    init_logging();
    let store = KeyStore::from_mnemonic(ABANDON, "", Network::Testnet).unwrap();
    let account = store.crypto_account();

    let mut encoder = account.ur_encoder().unwrap().with_part_len(40).unwrap();
    assert!(!encoder.is_single_part());
    let mut decoder = URDecoder::new();
    transfer(&mut encoder, &mut decoder);

    let received = CryptoAccount::from_ur(&decoder).unwrap();
    assert_eq!(received, account);
    assert_eq!(received.master_fingerprint, store.fingerprint());

    let descriptor = received.outputs[0].descriptor(false).unwrap();
    assert_eq!(descriptor, format!("wpkh([73c5da0a/84'/1'/0']{})", store.account()));

    //The watch only side can rebuild the account key
    let key = received.outputs[0].hd_key().unwrap().to_hdkey().unwrap();
    assert_eq!(key.to_string(), store.account().to_string());

    //Same transfer read as the wrong registry type
    let err = CryptoPsbt::from_ur(&decoder).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
}

#[test]
fn psbt_round_trip_through_the_signer() {
    init_logging();
    let store = KeyStore::from_mnemonic(MINI_WALLET, "", Network::Regtest).unwrap();
    let unsigned = Psbt::parse(&hex::decode(MINI_PSBT).unwrap()).unwrap();

    //Coordinator to signer
    let mut encoder = CryptoPsbt::from_psbt(&unsigned).ur_encoder().unwrap().with_part_len(60).unwrap();
    let mut decoder = URDecoder::new();
    transfer(&mut encoder, &mut decoder);
    let mut psbt = CryptoPsbt::from_ur(&decoder).unwrap().to_psbt().unwrap();
    assert_eq!(psbt, unsigned);

    let summary = store.parse_psbt(&psbt).unwrap();
    assert_eq!(summary.fee, 2840);
    assert_eq!(summary.spending, 30_002_840);
    assert_eq!(
        summary.spending_outputs,
        vec![(Some("2NFULfHPQUBpFWCfvjHoVu5nnE48SFbkmLC".to_string()), 30_000_000)]
    );
    assert_eq!(store.sign_psbt(&mut psbt).unwrap(), 1);

    //Signer back to coordinator
    let mut encoder = CryptoPsbt::from_psbt(&psbt).ur_encoder().unwrap().with_part_len(60).unwrap();
    let mut decoder = URDecoder::new();
    transfer(&mut encoder, &mut decoder);
    let signed = CryptoPsbt::from_ur(&decoder).unwrap().to_psbt().unwrap();
    assert_eq!(signed, psbt);
    assert_eq!(signed.inputs[0].partial_sigs.len(), 1);
    assert_eq!(signed.tx, unsigned.tx);

    //The summary does not depend on the signatures
    assert_eq!(store.parse_psbt(&signed).unwrap(), summary);
}

#[test]
fn interleaved_transfers_are_rejected() {
    init_logging();
    let first = UREncoder::new("bytes", &[1u8; 98]).unwrap().with_part_len(25).unwrap();
    let second = UREncoder::new("bytes", &[2u8; 98]).unwrap().with_part_len(25).unwrap();

    let mut decoder = URDecoder::new();
    decoder.read_part(&first.get_part(0)).unwrap();
    let err = decoder.read_part(&second.get_part(1)).unwrap_err();
    assert_eq!(btc_urkit::Error::from(err).kind(), ErrorKind::Protocol);

    //The first transfer is still intact
    for idx in 1..4 {
        decoder.read_part(&first.get_part(idx)).unwrap();
    }
    assert_eq!(decoder.result().unwrap(), vec![1u8; 98]);
}
