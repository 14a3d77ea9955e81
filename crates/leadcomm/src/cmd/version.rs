use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("leadcomm {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: leadcomm");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("LEADCOMM_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "profile: {}",
        option_env!("LEADCOMM_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "features: service={}, async={}, cli=true",
        cfg!(feature = "service"),
        cfg!(feature = "async")
    );
    println!(
        "framing: delimiter={:?}, disconnect={:?}",
        char::from(leadcomm_frame::DELIMITER),
        String::from_utf8_lossy(leadcomm_frame::DISCONNECT)
    );

    Ok(SUCCESS)
}
