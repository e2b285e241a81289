use motevo_rs::error::MotevoError;
use motevo_rs::parse;
use motevo_rs::types::{SITE_COLUMNS, PRIOR_COLUMNS};
use polars::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_parse_sites() {
    let promoter_chr8 = "danRer11_chr8_51404306_51405306_-";
    let expected: DataFrame = df!(
        "motif" => ["REST"; 15],
        "reference_promoter" => [
            "danRer11_chr21_11468142_11469142_+",
            "danRer11_chr10_21587502_21588502_+",
            "danRer11_chr6_43091675_43092675_-",
            "danRer11_chr5_29749877_29750877_-",
            "danRer11_chr4_17390591_17391591_-",
            "danRer11_chr21_6113805_6114805_+",
            "danRer11_chr25_5034843_5035843_+",
            "danRer11_chr25_5034843_5035843_+",
            "danRer11_chr9_68434_69447_-",
            promoter_chr8,
            promoter_chr8,
            promoter_chr8,
            promoter_chr8,
            promoter_chr8,
            "danRer11_chr17_12384808_12385808_-",
        ],
        "reference_binding_strand" => [
            "-", "-", "-", "+", "-", "+", "+", "+", "+", "-", "-", "-", "-", "-", "-",
        ],
        "motif_coordinates" => [
            "471-491", "75-95", "869-889", "602-622", "182-202", "936-956", "896-916",
            "896-916", "671-691", "742-762", "742-762", "742-762", "742-762", "742-762",
            "776-796",
        ],
        "posterior" => [
            0.546355, 0.991828, 0.362056, 0.999812, 0.997489, 0.107395, 0.999404, 0.999404,
            0.319236, 0.716461, 0.716461, 0.716461, 0.716461, 0.716461, 0.999844,
        ],
        "aligned_promoter" => [
            "danRer11_chr21_11468142_11469142_+",
            "danRer11_chr10_21587502_21588502_+",
            "danRer11_chr6_43091675_43092675_-",
            "danRer11_chr5_29749877_29750877_-",
            "danRer11_chr4_17390591_17391591_-",
            "danRer11_chr21_6113805_6114805_+",
            "danRer11_chr25_5034843_5035843_+",
            "ictPun_chr14_23588333_23589324_-",
            "danRer11_chr9_68434_69447_-",
            promoter_chr8,
            "astMex_chr6_11399458_11400473_-",
            "pygNat_KV575330.1_1811789_1812923_-",
            "ictPun_chr5_4628508_4629508_-",
            "esoLuc_chrLG13_14038768_14039768_+",
            "danRer11_chr17_12384808_12385808_-",
        ],
        "score" => [
            20.3009, 13.495, 9.07795, 18.1038, 16.0274, 8.6284, 18.1535, 14.0058, 9.37126,
            5.93671, 16.4049, 16.4049, 12.4296, 10.2324, 18.9164,
        ],
        "binding_sequence" => [
            "AGCGCTGTCCTTGGTGCTGAC",
            "CTCGTTGTCCAAGGTGCTGAA",
            "TTATTTGTCCATGGTTCTGAT",
            "GTACCTGTCCTTGGTGCTGAA",
            "GCTGCTCTCCAAGGTACTGAA",
            "GCTGCTGTTCCGCGTGCTGGA",
            "ATCGCTGTCCATGGTGCTGCA",
            "GCTACTGTCCATGGTGCTGTT",
            "CCCGCTGTCCGCCGTTCTGGA",
            "GGCGCTGTCTTTAGTACAGGA",
            "GGCGCTGTCCTTGGTGCAGGA",
            "GGCGCTGTCCTTGGTGCAGGA",
            "GGCGCTGTCTTTGGTGCAGGA",
            "GGCACTGTCTTTGGTGCAGGA",
            "AGCGCTCTCCGCGGTGCTGAA",
        ],
    )
    .unwrap();

    let df = parse::parse_sites("tests/data/sites_REST.wm").unwrap();
    assert_eq!(df.height(), 15);
    assert_eq!(df.get_column_names_str(), SITE_COLUMNS.to_vec());
    assert!(df.equals(&expected));

    // test file does not exist
    let result = parse::parse_sites("tests/data/nonexistent.wm");
    assert!(matches!(result, Err(MotevoError::Io(_))));
}

#[test]
fn test_single_site() {
    let file = write_temp(
        "471-491 - 0.546355 REST danRer11_chr21_11468142_11469142_+\n\
         AGCGCTGTCCTTGGTGCTGAC 20.3009 danRer11_chr21_11468142_11469142_+\n",
    );

    let records = parse::read_site_records(file.path()).unwrap();
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record.motif, "REST");
    assert_eq!(record.reference_promoter, "danRer11_chr21_11468142_11469142_+");
    assert_eq!(record.reference_binding_strand, "-");
    assert_eq!(record.motif_coordinates, "471-491");
    assert_eq!(record.posterior, 0.546355);
    assert_eq!(record.aligned_promoter, "danRer11_chr21_11468142_11469142_+");
    assert_eq!(record.score, 20.3009);
    assert_eq!(record.binding_sequence, "AGCGCTGTCCTTGGTGCTGAC");
}

#[test]
fn test_sites_keep_file_order() {
    let records = parse::read_site_records("tests/data/sites_REST.wm").unwrap();

    // the 742-762 site has five aligned sequences
    let group: Vec<_> = records
        .iter()
        .filter(|r| r.motif_coordinates == "742-762")
        .collect();
    assert_eq!(group.len(), 5);
    assert!(group.iter().all(|r| r.posterior == 0.716461));
    assert!(group
        .iter()
        .all(|r| r.reference_promoter == "danRer11_chr8_51404306_51405306_-"));
    assert_eq!(group[1].aligned_promoter, "astMex_chr6_11399458_11400473_-");
    assert_eq!(group[4].aligned_promoter, "esoLuc_chrLG13_14038768_14039768_+");

    assert_eq!(records.first().unwrap().motif_coordinates, "471-491");
    assert_eq!(records.last().unwrap().motif_coordinates, "776-796");
}

#[test]
fn test_header_without_sequences() {
    let file = write_temp(
        "10-20 + 0.9 REST promoterA\n\
         30-40 - 0.8 REST promoterB\n\
         ACGTACGTAC 5.5 promoterB\n\
         ACGTACGTAA 4.5 speciesB\n",
    );

    let records = parse::read_site_records(file.path()).unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.reference_promoter == "promoterB"));
    assert_eq!(records[1].aligned_promoter, "speciesB");
}

#[test]
fn test_malformed_header_truncates() {
    let file = write_temp(
        "10-20 + 0.9 REST promoterA\n\
         ACGTACGTAC 5.5 promoterA\n\
         ACGTACGTAA 4.5 speciesA\n\
         x30-40 - 0.8 REST promoterB\n\
         ACGTACGTAC 3.5 promoterB\n\
         50-60 - 0.7 REST promoterC\n\
         ACGTACGTAC 2.5 promoterC\n",
    );

    let records = parse::read_site_records(file.path()).unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.reference_promoter == "promoterA"));
}

#[test]
fn test_missing_first_header_returns_nothing() {
    let file = write_temp("ACGTACGTAC 5.5 promoterA\n10-20 + 0.9 REST promoterA\n");

    let df = parse::parse_sites(file.path()).unwrap();
    assert_eq!(df.height(), 0);
    assert_eq!(df.width(), SITE_COLUMNS.len());
}

#[test]
fn test_blank_lines_are_skipped() {
    let file = write_temp(
        "\n10-20 + 0.9 REST promoterA\n\
         ACGTACGTAC 5.5 promoterA\n\
         \n\
         30-40 - 0.8 REST promoterB\n\
         ACGTACGTAA 4.5 promoterB\n\n",
    );

    let records = parse::read_site_records(file.path()).unwrap();
    assert_eq!(records.len(), 2);
}

#[test]
fn test_invalid_numbers_are_errors() {
    let file = write_temp("10-20 + 0.9 REST promoterA\nACGTACGTAC high promoterA\n");
    match parse::read_site_records(file.path()) {
        Err(MotevoError::InvalidNumber { line, field, value, .. }) => {
            assert_eq!(line, 2);
            assert_eq!(field, "score");
            assert_eq!(value, "high");
        }
        other => panic!("expected an invalid score, got {:?}", other),
    }

    let file = write_temp("10-20 + likely REST promoterA\nACGTACGTAC 1.0 promoterA\n");
    assert!(matches!(
        parse::read_site_records(file.path()),
        Err(MotevoError::InvalidNumber { field: "posterior", .. })
    ));

    let file = write_temp("10-20 + 0.9 REST\nACGTACGTAC 1.0 promoterA\n");
    assert!(matches!(
        parse::read_site_records(file.path()),
        Err(MotevoError::InvalidFileFormat(_))
    ));
}

#[test]
fn test_parse_priors() {
    let expected: DataFrame = df!(
        "motif" => ["REST", "background", "UFEwm"],
        "final_prior" => [0.00310981, 0.828626, 0.168265],
        "nr_of_sites" => [7.04002, 1875.85, 380.919],
        "density" => [0.0147501, 0.187155, 0.798095],
    )
    .unwrap();

    let df = parse::parse_priors("tests/data/priors_REST.wm")
        .unwrap()
        .unwrap();
    assert_eq!(df.get_column_names_str(), PRIOR_COLUMNS.to_vec());
    assert!(df.equals(&expected));

    let result = parse::parse_priors("tests/data/nonexistent.wm");
    assert!(matches!(result, Err(MotevoError::Io(_))));
}

#[test]
fn test_priors_with_two_rows() {
    let file = write_temp(
        "WM_name final_prior nr_of_sites density\n\
         REST 0.00310981 7.04002 0.0147501\n\
         background 0.828626 1875.85 0.187155\n",
    );

    assert!(parse::parse_priors(file.path()).unwrap().is_none());
    assert!(parse::read_prior_records(file.path()).unwrap().is_none());
}

#[test]
fn test_malformed_priors() {
    let file = write_temp(
        "WM_name final_prior nr_of_sites density\n\
         REST 0.00310981 7.04002 0.0147501\n\
         background n/a 1875.85 0.187155\n\
         UFEwm 0.168265 380.919 0.798095\n",
    );
    assert!(parse::parse_priors(file.path()).unwrap().is_none());

    let file = write_temp(
        "WM_name final_prior nr_of_sites density\n\
         REST 0.00310981 7.04002\n\
         background 0.828626 1875.85 0.187155\n\
         UFEwm 0.168265 380.919 0.798095\n",
    );
    assert!(parse::parse_priors(file.path()).unwrap().is_none());

    let file = write_temp("");
    assert!(parse::read_prior_records(file.path()).unwrap().is_none());
}

#[test]
fn test_undecodable_priors() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"WM_name final_prior nr_of_sites density\n").unwrap();
    file.write_all(b"REST 0.00310981 7.04002 0.0147501\n").unwrap();
    file.write_all(b"background\xff\xfe 0.828626 1875.85 0.187155\n").unwrap();
    file.write_all(b"UFEwm 0.168265 380.919 0.798095\n").unwrap();

    assert!(matches!(parse::read_prior_records(file.path()), Ok(None)));
    assert!(parse::parse_priors(file.path()).unwrap().is_none());
}

#[test]
fn test_prior_records() {
    let records = parse::read_prior_records("tests/data/priors_REST.wm")
        .unwrap()
        .unwrap();
    let labels: Vec<&str> = records.iter().map(|r| r.motif.as_str()).collect();
    assert_eq!(labels, ["REST", "background", "UFEwm"]);
    assert_eq!(records[1].nr_of_sites, 1875.85);
}
