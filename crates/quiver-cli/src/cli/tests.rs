#[cfg(test)]
mod tests {
    use crate::cli::{Cli, Command};
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_build_defaults() {
        let cli = Cli::try_parse_from(["quiver", "build"]).unwrap();
        match cli.command {
            Command::Build(args) => {
                assert!(args.cwd.is_none());
                assert!(args.config.is_none());
            }
            other => panic!("expected build, got {other:?}"),
        }
        assert!(!cli.verbose);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_build_with_paths() {
        let cli = Cli::try_parse_from([
            "quiver",
            "build",
            "--cwd",
            "app",
            "--config",
            "configs/quiver.toml",
        ])
        .unwrap();
        let Command::Build(args) = cli.command else {
            panic!("expected build");
        };
        assert_eq!(args.cwd, Some(PathBuf::from("app")));
        assert_eq!(args.config, Some(PathBuf::from("configs/quiver.toml")));
    }

    #[test]
    fn test_dev_port() {
        let cli = Cli::try_parse_from(["quiver", "dev", "-p", "4000"]).unwrap();
        let Command::Dev(args) = cli.command else {
            panic!("expected dev");
        };
        assert_eq!(args.port, Some(4000));
    }

    #[test]
    fn test_dev_rejects_port_zero() {
        assert!(Cli::try_parse_from(["quiver", "dev", "--port", "0"]).is_err());
        assert!(Cli::try_parse_from(["quiver", "dev", "--port", "70000"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["quiver", "dev", "--verbose", "--no-color"]).unwrap();
        assert!(cli.verbose);
        assert!(cli.no_color);
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["quiver", "-v", "-q", "build"]).is_err());
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["quiver"]).is_err());
    }
}
