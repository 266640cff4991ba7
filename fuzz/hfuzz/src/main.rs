extern crate xex;
#[macro_use] extern crate honggfuzz;

fn main() {
    loop {
        fuzz!(|data: &[u8]| {
            if let Ok(xex) = xex::Xex::parse(data) {
                // everything that decodes must re-encode
                xex.header().to_bytes().unwrap();
                if let Some(info) = xex.security_info() {
                    info.to_bytes().unwrap();
                }
            }
        });
    }
}
