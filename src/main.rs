fn main() {
    securevpn_lib::run()
}
