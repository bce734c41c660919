fn main() {
    let proto_files = ["src/proto/fileformat.proto", "src/proto/osmformat.proto"];

    for path in &proto_files {
        println!("cargo:rerun-if-changed={path}");
    }

    protobuf_codegen::Codegen::new()
        .pure()
        .cargo_out_dir("proto")
        .include("src/proto")
        .inputs(proto_files)
        .run_from_script();
}
