use std::env::var;
use std::io::Result;

fn main() -> Result<()> {
    // Services are declared in their own file so the descriptor set carries
    // cross-file type references.
    let proto_files = &["proto/pkg/services.proto", "proto/pkg/types.proto"];

    let proto_folder = "proto";
    let out_dir = var("OUT_DIR").expect("Missing OUT_DIR environment variable");
    let descriptors_path = format!("{}/descriptors.bin", out_dir);

    tonic_prost_build::configure()
        .file_descriptor_set_path(descriptors_path)
        .protoc_arg("--experimental_allow_proto3_optional")
        .build_client(false)
        .compile_protos(proto_files, &[proto_folder])?;

    Ok(())
}
