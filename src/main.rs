fn main() {
    if let Err(err) = ros_node_viewer::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
