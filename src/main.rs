fn main() {
    varname_inference::start_cli();
}
