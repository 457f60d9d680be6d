fn main() {
    // Compile all proto files for the estimation pipeline.
    // Servers are generated too: the gateway hosts two of them and tests
    // stand up in-process stage backends.

    let services = [
        "../../proto/services/common.proto",
        "../../proto/services/auth_service.proto",
        "../../proto/services/gateway.proto",
        "../../proto/services/fetch_service.proto",
        "../../proto/services/prepare_service.proto",
        "../../proto/services/estimate_service.proto",
    ];

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&services, &["../../proto/services/"])
        .unwrap_or_else(|e| panic!("Failed to compile estimation protos: {}", e));

    println!("cargo:rerun-if-changed=../../proto/services/");
}
