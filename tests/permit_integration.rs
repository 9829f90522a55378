//! End-to-end Permit signing through the public API

use eip712_signer::eip712::{parse_private_key, signing_digest_from_parts, verify_typed_data};
use eip712_signer::utils::hex_format::decode_hex_array;
use eip712_signer::{
    split, EcdsaSigner, Eip712Config, Eip712Domain, Eip712Error, Eip712Signature, ErrorCode,
    Secp256k1Signer, TypeRegistry, TypedData, TypedDataEncoder, VConvention, Value,
};
use serde_json::json;

const OWNER_KEY: &str = "0x9e99449797b670840f53a749df174a19772bcd4c6b52e976ab139812d4646f0a";
const OWNER: &str = "0xcfdfcdf4e30cf2c9caa2c239677c8d42ad7d67de";
const SPENDER: &str = "0x0D1d31abea2384b0D5add552E3a9b9F66d57e141";
const TOKEN: &str = "0xf925e7d14E89736700B73CA27ECceeB0A088383f";
const MAX_UINT: &str = "0xffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff";
const DIGEST: &str = "fa8f444aeb3deb98076160e7f4c3e88495b7a985fe9817f5596bab63223290ba";

fn permit_document() -> TypedData {
    serde_json::from_value(json!({
        "types": {
            "EIP712Domain": [
                {"name": "name", "type": "string"},
                {"name": "version", "type": "string"},
                {"name": "chainId", "type": "uint256"},
                {"name": "verifyingContract", "type": "address"}
            ],
            "Permit": [
                {"name": "owner", "type": "address"},
                {"name": "spender", "type": "address"},
                {"name": "value", "type": "uint256"},
                {"name": "nonce", "type": "uint256"},
                {"name": "deadline", "type": "uint256"}
            ]
        },
        "primaryType": "Permit",
        "domain": {
            "name": "Fixed Income Asset Token",
            "version": "1",
            "chainId": 99,
            "verifyingContract": TOKEN
        },
        "message": {
            "owner": OWNER,
            "spender": SPENDER,
            "value": MAX_UINT,
            "nonce": 0,
            "deadline": MAX_UINT
        }
    }))
    .unwrap()
}

#[test]
fn permit_document_signs_and_recovers() {
    let typed_data = permit_document();
    typed_data.validate().unwrap();

    let pre_image = typed_data.pre_image().unwrap();
    assert_eq!(hex::encode(pre_image.final_hash), DIGEST);
    assert_eq!(
        signing_digest_from_parts(&pre_image.domain_separator, &pre_image.struct_hash),
        pre_image.final_hash
    );

    let key = parse_private_key(OWNER_KEY).unwrap();
    let signer = Secp256k1Signer::new();
    let signature = signer.sign(&pre_image.final_hash, &key[..]).unwrap();

    // Wire form survives the codec unchanged
    let wire = signature.to_hex();
    let parsed = Eip712Signature::from_hex(&wire).unwrap();
    let (r, s, v) = split(&parsed.to_bytes()).unwrap();
    assert_eq!((r, s, v), (signature.r, signature.s, signature.v));

    let recovered = signer.recover(&pre_image.final_hash, &parsed.to_bytes()).unwrap();
    assert_eq!(recovered, decode_hex_array::<20>(OWNER).unwrap());
    assert!(verify_typed_data(&typed_data, &parsed, OWNER).unwrap());
}

#[test]
fn typed_builder_matches_json_document() {
    let domain = Eip712Domain::new()
        .with_name("Fixed Income Asset Token")
        .with_version("1")
        .with_chain_id(99u64)
        .with_verifying_contract(decode_hex_array(TOKEN).unwrap());

    let mut registry = TypeRegistry::new();
    registry
        .register_parsed(
            "Permit",
            &[
                ("owner", "address"),
                ("spender", "address"),
                ("value", "uint256"),
                ("nonce", "uint256"),
                ("deadline", "uint256"),
            ],
        )
        .unwrap();

    let message = Value::record_from_json(&registry, "Permit", &permit_document().message).unwrap();
    let pre_image = domain.pre_image(&registry, "Permit", &message).unwrap();
    assert_eq!(hex::encode(pre_image.final_hash), DIGEST);

    domain.register(&mut registry).unwrap();
    let encoder = TypedDataEncoder::new(&registry);
    assert_eq!(
        encoder.signing_digest(&domain.to_value(), "Permit", &message).unwrap(),
        pre_image.final_hash
    );
}

#[test]
fn config_controls_v_and_depth() {
    let config = Eip712Config::from_json(r#"{"vConvention": "raw", "maxDepth": 1}"#).unwrap();
    assert_eq!(config.v_convention, VConvention::Raw);
    assert_eq!(config.domain_type, "EIP712Domain");

    // Permit is flat, so a depth of one is enough
    let typed_data = permit_document();
    let digest = typed_data.hash_with(&config).unwrap();
    assert_eq!(hex::encode(digest), DIGEST);

    let key = parse_private_key(OWNER_KEY).unwrap();
    let signature = Secp256k1Signer::with_config(config).sign(&digest, &key[..]).unwrap();
    assert!(signature.v <= 1);

    assert!(matches!(
        Eip712Config::from_json(r#"{"maxDepth": 0}"#),
        Err(Eip712Error::InvalidConfig(_))
    ));
}

#[test]
fn failures_are_reported_not_coerced() {
    let mut typed_data = permit_document();
    typed_data.message["value"] = json!(format!("{}ffff", MAX_UINT));
    let err = typed_data.hash().unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValueError);
    assert!(err.to_string().contains("Permit.value"));

    let mut typed_data = permit_document();
    typed_data.message.as_object_mut().unwrap().remove("deadline");
    assert!(matches!(typed_data.hash(), Err(Eip712Error::SchemaMismatch { .. })));

    assert_eq!(
        Eip712Signature::from_hex("0x1234").unwrap_err(),
        Eip712Error::InvalidSignatureLength(2)
    );
}
