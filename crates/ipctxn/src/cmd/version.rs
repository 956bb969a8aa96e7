use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("ipctxn {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: ipctxn");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("IPCTXN_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "profile: {}",
        option_env!("IPCTXN_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!(
        "max_parcel_size: {}",
        ipctxn_parcel::DEFAULT_MAX_PARCEL_SIZE
    );
    println!(
        "features: portal={}, cli=true",
        cfg!(feature = "portal")
    );

    Ok(SUCCESS)
}
