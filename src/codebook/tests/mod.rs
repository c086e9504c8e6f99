//! Test fixtures for codebook and decoder testing
//!
//! Provides a small rectangular and a small hierarchical extract codebook,
//! plus line builders that lay values out on the matching column spans.

use std::io::Write;
use tempfile::NamedTempFile;

use crate::codebook::Codebook;

mod source_tests;

const STUDY_DESCRIPTION: &str = r#"
  <stdyDscr>
    <citation>
      <serStmt>
        <serName abbr="cps">Current Population Survey</serName>
        <serInfo>https://doi.org/10.18128/D030.V9.0</serInfo>
      </serStmt>
    </citation>
    <stdyInfo>
      <notes>cps2020_03s: IPUMS-CPS, ASEC 2020
Additional sample notes</notes>
      <notes>cps2021_03s: IPUMS-CPS, ASEC 2021</notes>
    </stdyInfo>
    <dataAccs>
      <useStmt>
        <citReq>Please cite the data source.</citReq>
        <conditions>Redistribution is not permitted.</conditions>
      </useStmt>
    </dataAccs>
  </stdyDscr>"#;

/// Rectangular codebook: YEAR 1-4, SERIAL 5-12, MONTH 13-14, STATEFIP 15-16,
/// WTFINL 43-56 (4 decimals), NAME 57-64 (character), SEX 65, AGE 71-72
pub fn rectangular_codebook_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<codeBook xmlns="ddi:codebook:2_5" version="2.5">{}
  <fileDscr>
    <fileTxt>
      <fileName>cps_00006.dat</fileName>
      <fileCont>Rectangular test extract</fileCont>
      <fileStrc type="rectangular"/>
      <fileType charset="ISO-8859-1">ascii</fileType>
      <format>fixed length fields</format>
      <filePlac>Minneapolis, MN</filePlac>
    </fileTxt>
  </fileDscr>
  <dataDscr>
    <var ID="YEAR" name="YEAR" dcml="0">
      <location StartPos="1" EndPos="4" width="4"/>
      <labl>Survey year</labl>
      <varFormat type="numeric" schema="other"/>
    </var>
    <var ID="SERIAL" name="SERIAL" dcml="0">
      <location StartPos="5" EndPos="12" width="8"/>
      <labl>Household serial number</labl>
      <varFormat type="numeric" schema="other"/>
    </var>
    <var ID="MONTH" name="MONTH" dcml="0">
      <location StartPos="13" EndPos="14" width="2"/>
      <labl>Month</labl>
      <txt>Calendar month of the survey.</txt>
      <concept>Technical</concept>
      <catgry><catValu>1</catValu><labl>January</labl></catgry>
      <catgry><catValu>2</catValu><labl>February</labl></catgry>
      <catgry><catValu>3</catValu><labl>March</labl></catgry>
      <varFormat type="numeric" schema="other"/>
    </var>
    <var ID="STATEFIP" name="STATEFIP" dcml="0">
      <location StartPos="15" EndPos="16" width="2"/>
      <labl>State (FIPS code)</labl>
      <catgry><catValu>01</catValu><labl>Alabama</labl></catgry>
      <catgry><catValu>27</catValu><labl>Minnesota</labl></catgry>
      <varFormat type="numeric" schema="other"/>
    </var>
    <var ID="WTFINL" name="WTFINL" dcml="4">
      <location StartPos="43" EndPos="56" width="14"/>
      <labl>Final basic weight</labl>
      <varFormat type="numeric" schema="other"/>
    </var>
    <var ID="NAME" name="NAME">
      <location StartPos="57" EndPos="64" width="8"/>
      <labl>Respondent alias</labl>
      <varFormat type="character" schema="other"/>
    </var>
    <var ID="SEX" name="SEX" dcml="0">
      <location StartPos="65" EndPos="65" width="1"/>
      <labl>Sex</labl>
      <catgry><catValu>1</catValu><labl>Male</labl></catgry>
      <catgry><catValu>2</catValu><labl>Female</labl></catgry>
      <varFormat type="numeric" schema="other"/>
    </var>
    <var ID="AGE" name="AGE" dcml="0">
      <location StartPos="71" EndPos="72" width="2"/>
      <labl>Age</labl>
      <notes>Top coded at 85.</notes>
      <varFormat type="numeric" schema="other"/>
    </var>
  </dataDscr>
</codeBook>"#,
        STUDY_DESCRIPTION
    )
}

/// Hierarchical codebook with household (H) and person (P) records linked by
/// SERIAL. Common: RECTYPE 1, YEAR 2-5, SERIAL 6-10. Household: NUMPREC 11-12,
/// HHWT 13-22 (2 decimals), STATEFIP 23-24. Person: PERNUM 11-12, PERWT 13-22
/// (2 decimals), AGE 23-25, SEX 26.
pub fn hierarchical_codebook_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<codeBook xmlns="ddi:codebook:2_5" version="2.5">{}
  <fileDscr>
    <fileTxt>
      <fileName>usa_00012.dat</fileName>
      <fileCont>Hierarchical test extract</fileCont>
      <fileStrc type="hierarchical">
        <recGrp rectype="H" keyvar="SERIAL" recidvar="RECTYPE"><labl>household</labl></recGrp>
        <recGrp rectype="P" keyvar="SERIAL" recidvar="RECTYPE"><labl>person</labl></recGrp>
      </fileStrc>
      <fileType charset="iso-8859-1">ascii</fileType>
      <format>fixed length fields</format>
    </fileTxt>
  </fileDscr>
  <dataDscr>
    <var ID="RECTYPE" name="RECTYPE" rectype="H P">
      <location StartPos="1" EndPos="1" width="1"/>
      <labl>Record type</labl>
      <catgry><catValu>H</catValu><labl>Household record</labl></catgry>
      <catgry><catValu>P</catValu><labl>Person record</labl></catgry>
      <varFormat type="character" schema="other"/>
    </var>
    <var ID="YEAR" name="YEAR" dcml="0" rectype="H P">
      <location StartPos="2" EndPos="5" width="4"/>
      <labl>Census year</labl>
      <varFormat type="numeric" schema="other"/>
    </var>
    <var ID="SERIAL" name="SERIAL" dcml="0" rectype="H P">
      <location StartPos="6" EndPos="10" width="5"/>
      <labl>Household serial number</labl>
      <varFormat type="numeric" schema="other"/>
    </var>
    <var ID="NUMPREC" name="NUMPREC" dcml="0" rectype="H">
      <location StartPos="11" EndPos="12" width="2"/>
      <labl>Number of person records</labl>
      <varFormat type="numeric" schema="other"/>
    </var>
    <var ID="HHWT" name="HHWT" dcml="2" rectype="H">
      <location StartPos="13" EndPos="22" width="10"/>
      <labl>Household weight</labl>
      <varFormat type="numeric" schema="other"/>
    </var>
    <var ID="STATEFIP" name="STATEFIP" dcml="0" rectype="H">
      <location StartPos="23" EndPos="24" width="2"/>
      <labl>State (FIPS code)</labl>
      <varFormat type="numeric" schema="other"/>
    </var>
    <var ID="PERNUM" name="PERNUM" dcml="0" rectype="P">
      <location StartPos="11" EndPos="12" width="2"/>
      <labl>Person number in sample unit</labl>
      <varFormat type="numeric" schema="other"/>
    </var>
    <var ID="PERWT" name="PERWT" dcml="2" rectype="P">
      <location StartPos="13" EndPos="22" width="10"/>
      <labl>Person weight</labl>
      <varFormat type="numeric" schema="other"/>
    </var>
    <var ID="AGE" name="AGE" dcml="0" rectype="P">
      <location StartPos="23" EndPos="25" width="3"/>
      <labl>Age</labl>
      <varFormat type="numeric" schema="other"/>
    </var>
    <var ID="SEX" name="SEX" dcml="0" rectype="P">
      <location StartPos="26" EndPos="26" width="1"/>
      <labl>Sex</labl>
      <varFormat type="numeric" schema="other"/>
    </var>
  </dataDscr>
</codeBook>"#,
        STUDY_DESCRIPTION
    )
}

pub fn rectangular_codebook() -> Codebook {
    Codebook::from_xml_str(&rectangular_codebook_xml()).unwrap()
}

pub fn hierarchical_codebook() -> Codebook {
    Codebook::from_xml_str(&hierarchical_codebook_xml()).unwrap()
}

/// A 72-byte rectangular line; `weight` is the raw 14-digit WTFINL field
#[allow(clippy::too_many_arguments)]
pub fn rectangular_line(
    year: u32,
    serial: u32,
    month: u32,
    statefip: u32,
    weight: &str,
    name: &str,
    sex: u32,
    age: u32,
) -> String {
    format!(
        "{:04}{:08}{:02}{:02}{}{:>14}{:<8}{}{}{:02}",
        year,
        serial,
        month,
        statefip,
        " ".repeat(26),
        weight,
        name,
        sex,
        " ".repeat(5),
        age
    )
}

/// A 24-byte household line; `weight` is in hundredths
pub fn household_line(serial: u32, numprec: u32, weight: u64, statefip: u32) -> String {
    format!(
        "H2020{:05}{:02}{:010}{:02}",
        serial, numprec, weight, statefip
    )
}

/// A 26-byte person line; `weight` is in hundredths
pub fn person_line(serial: u32, pernum: u32, weight: u64, age: u32, sex: u32) -> String {
    format!(
        "P2020{:05}{:02}{:010}{:03}{}",
        serial, pernum, weight, age, sex
    )
}

/// Three households with 2, 1 and 3 persons
pub fn hierarchical_lines() -> Vec<String> {
    vec![
        household_line(1, 2, 10050, 27),
        person_line(1, 1, 10050, 42, 1),
        person_line(1, 2, 9025, 40, 2),
        household_line(2, 1, 20000, 1),
        person_line(2, 1, 20000, 67, 2),
        household_line(3, 3, 15075, 27),
        person_line(3, 1, 15075, 35, 1),
        person_line(3, 2, 15075, 33, 2),
        person_line(3, 3, 12000, 5, 1),
    ]
}

/// Helper to create a temporary file with given content
pub fn create_temp_file(content: &[u8]) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content).unwrap();
    temp_file.flush().unwrap();
    temp_file
}
