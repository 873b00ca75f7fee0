//! Build script for pingkit-proto.
//!
//! Compiles the ping.v1 protobuf definition, using protobuf-src to build
//! protoc from source when it is not available on the system.

use std::path::PathBuf;

fn main() {
    let proto_file = "proto/ping.proto";
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").unwrap());

    println!("cargo:rerun-if-changed={proto_file}");

    let mut prost_config = prost_build::Config::new();
    prost_config.protoc_executable(protobuf_src::protoc());

    tonic_build::configure()
        // The server trait is consumed by the in-process service double in tests
        .build_server(true)
        .build_client(true)
        .emit_rerun_if_changed(true)
        .out_dir(&out_dir)
        .compile_protos_with_config(prost_config, &[proto_file], &["proto"])
        .unwrap_or_else(|e| panic!("Failed to compile proto files: {e}"));
}
