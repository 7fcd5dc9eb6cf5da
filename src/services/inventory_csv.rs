// src/services/inventory_csv.rs
//
// Planilhas do inventário: leitura do arquivo do coletor, modelo para
// download e exportação dos itens.

use std::collections::{HashMap, HashSet};

use crate::{
    common::{datetime::format_br, error::AppError, rfid::{normalize_read_code, normalize_tag_code}},
    models::inventory::{CsvReconciliation, InventoryItem, ItemStatus, LocationOrigin},
};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub const TEMPLATE: &str = "EPC,Observacao\n\
0000000000000000000000A1,Exemplo etiqueta padrão\n\
617061720000000000000B22,Exemplo etiqueta alternativa\n\
AAA0AAAA0000000000001A2B,Exemplo etiqueta com prefixo\n\
32366259FC00000000000001,Exemplo etiqueta de fornecedor\n";

/// Códigos lidos do arquivo, sem repetição e na ordem em que aparecem.
#[derive(Debug, Default, PartialEq)]
pub struct EpcList {
    pub codes: Vec<String>,
    pub erros: Vec<String>,
}

pub fn parse_epc_csv(content: &[u8]) -> Result<EpcList, AppError> {
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
    let first_line = content.split(|b| *b == b'\n').next().unwrap_or_default();
    let delimiter = detect_delimiter(first_line);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content);

    let epc_column = reader
        .headers()?
        .iter()
        .position(|h| h.eq_ignore_ascii_case("EPC"))
        .ok_or_else(|| AppError::bad_request("O arquivo CSV deve conter a coluna 'EPC'"))?;

    let mut list = EpcList::default();
    let mut seen = HashSet::new();

    for (index, record) in reader.records().enumerate() {
        let line = index + 2; // linha 1 é o cabeçalho
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                list.erros.push(format!("Linha {line}: {e}"));
                continue;
            }
        };

        let code = normalize_read_code(record.get(epc_column).unwrap_or_default());
        if code.is_empty() {
            continue;
        }
        if !code.chars().all(|c| c.is_ascii_hexdigit()) {
            list.erros.push(format!("Linha {line}: EPC inválido '{code}'"));
            continue;
        }
        // mesmo formato usado no cadastro das etiquetas
        let code = normalize_tag_code(&code);
        if seen.insert(code.clone()) {
            list.codes.push(code);
        }
    }

    Ok(list)
}

// Vence o separador que isola a coluna EPC; sem ela, o mais frequente.
fn detect_delimiter(header: &[u8]) -> u8 {
    let header = String::from_utf8_lossy(header);
    let has_epc = |delimiter: char| {
        header
            .split(delimiter)
            .any(|field| field.trim().trim_matches('"').eq_ignore_ascii_case("EPC"))
    };

    match (has_epc(','), has_epc(';')) {
        (true, _) => b',',
        (false, true) => b';',
        (false, false) if header.matches(';').count() > header.matches(',').count() => b';',
        _ => b',',
    }
}

/// Monta o resumo a partir da situação dos itens antes da atualização.
pub fn summarize(
    list: EpcList,
    roster: &[(String, ItemStatus)],
    atualizadas: u64,
) -> CsvReconciliation {
    let roster: HashMap<&str, ItemStatus> = roster
        .iter()
        .map(|(code, status)| (code.as_str(), *status))
        .collect();

    let ja_localizadas = roster
        .values()
        .filter(|s| **s == ItemStatus::Localizado)
        .count();
    let nao_encontradas = list
        .codes
        .iter()
        .filter(|code| !roster.contains_key(code.as_str()))
        .cloned()
        .collect();

    CsvReconciliation {
        etiquetas_processadas: list.codes.len(),
        etiquetas_atualizadas: atualizadas as usize,
        ja_localizadas,
        nao_encontradas,
        erros: list.erros,
    }
}

pub fn export_items(itens: &[InventoryItem]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::WriterBuilder::new().delimiter(b';').from_writer(Vec::new());
    writer.write_record([
        "EPC",
        "Descricao",
        "Status",
        "Origem",
        "Leitor",
        "Antena",
        "DataLocalizacao",
        "Observacao",
    ])?;

    for item in itens {
        let status = match item.status {
            ItemStatus::Localizado => "Localizado",
            ItemStatus::NaoLocalizado => "Não localizado",
        };
        let origem = match item.origem {
            Some(LocationOrigin::Antena) => "Antena",
            Some(LocationOrigin::LeitorMovel) => "Leitor móvel",
            Some(LocationOrigin::Manual) => "Manual",
            None => "",
        };
        let antena = item.antena.map(|a| a.to_string()).unwrap_or_default();
        let data_localizacao = item.data_localizacao.map(format_br).unwrap_or_default();
        writer.write_record([
            item.etiqueta_hex.as_str(),
            item.descricao.as_deref().unwrap_or_default(),
            status,
            origem,
            item.codigo_leitor.as_deref().unwrap_or_default(),
            antena.as_str(),
            data_localizacao.as_str(),
            item.observacao.as_deref().unwrap_or_default(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::InternalServerError(anyhow::anyhow!("falha ao gerar CSV: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_epc_column_anywhere() {
        let csv = "Leitura,epc,Observacao\n1, aaa0aaaa0000000000000001 ,ok\n2,AAA0AAAA0000000000000002,\n";
        let list = parse_epc_csv(csv.as_bytes()).unwrap();

        assert_eq!(
            list.codes,
            vec!["AAA0AAAA0000000000000001", "AAA0AAAA0000000000000002"]
        );
        assert!(list.erros.is_empty());
    }

    #[test]
    fn handles_bom_semicolons_blanks_and_duplicates() {
        let csv = "\u{feff}EPC;Observacao\nAAA0AAAA0000000000000001;x\n;vazio\naaa0aaaa0000000000000001;repetida\n";
        let list = parse_epc_csv(csv.as_bytes()).unwrap();

        assert_eq!(list.codes, vec!["AAA0AAAA0000000000000001"]);
    }

    #[test]
    fn semicolon_header_with_commas_in_other_columns() {
        let csv = "EPC;Observacao, extra\nAAA0AAAA0000000000000007;caixa 1, prateleira 2\n";
        let list = parse_epc_csv(csv.as_bytes()).unwrap();

        assert_eq!(list.codes, vec!["AAA0AAAA0000000000000007"]);
        assert!(list.erros.is_empty());
    }

    #[test]
    fn short_codes_are_padded_like_registered_tags() {
        let csv = "EPC\n1a2b\nAAA0AAAA12\n";
        let list = parse_epc_csv(csv.as_bytes()).unwrap();

        assert_eq!(
            list.codes,
            vec!["AAA0AAAA0000000000001A2B", "AAA0AAAA1200000000000000"]
        );
    }

    #[test]
    fn reports_invalid_codes_with_line_number() {
        let csv = "EPC\nAAA0AAAA0000000000000001\nNAO-E-HEX\n";
        let list = parse_epc_csv(csv.as_bytes()).unwrap();

        assert_eq!(list.codes, vec!["AAA0AAAA0000000000000001"]);
        assert_eq!(list.erros, vec!["Linha 3: EPC inválido 'NAO-E-HEX'"]);
    }

    #[test]
    fn missing_epc_column_is_rejected() {
        let err = parse_epc_csv(b"codigo,obs\n123,x\n").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn template_is_accepted_by_the_parser() {
        let list = parse_epc_csv(TEMPLATE.as_bytes()).unwrap();
        assert_eq!(list.codes.len(), 4);
        assert!(list.erros.is_empty());
    }

    #[test]
    fn summary_splits_found_missing_and_already_located() {
        let list = EpcList {
            codes: vec!["A1".into(), "B2".into(), "C3".into()],
            erros: vec!["Linha 9: EPC inválido 'X'".into()],
        };
        let roster = vec![
            ("A1".to_string(), ItemStatus::Localizado),
            ("B2".to_string(), ItemStatus::NaoLocalizado),
        ];

        let summary = summarize(list, &roster, 1);

        assert_eq!(summary.etiquetas_processadas, 3);
        assert_eq!(summary.etiquetas_atualizadas, 1);
        assert_eq!(summary.ja_localizadas, 1);
        assert_eq!(summary.nao_encontradas, vec!["C3"]);
        assert_eq!(summary.erros.len(), 1);
    }

    #[test]
    fn export_writes_header_and_rows() {
        let item = InventoryItem {
            id: 1,
            id_inventario: 7,
            etiqueta_hex: "AAA0AAAA01".into(),
            descricao: Some("Chave de torque".into()),
            status: ItemStatus::Localizado,
            origem: Some(LocationOrigin::LeitorMovel),
            codigo_leitor: None,
            antena: None,
            data_localizacao: None,
            observacao: None,
        };

        let bytes = export_items(&[item]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next(),
            Some("EPC;Descricao;Status;Origem;Leitor;Antena;DataLocalizacao;Observacao")
        );
        assert_eq!(
            lines.next(),
            Some("AAA0AAAA01;Chave de torque;Localizado;Leitor móvel;;;;")
        );
    }
}
